//! Place value normalization and tokenization.
//!
//! GEDCOM places are comma-separated jurisdiction hierarchies
//! ("Brooklyn, Kings, New York, USA"). Comparison works on a normalized
//! form; blocking and scoring work on component tokens with filler words
//! removed.

/// Words that never identify a place on their own.
const PLACE_STOPWORDS: [&str; 16] = [
    "the", "of", "in", "on", "at", "to", "for", "and", "or", "county", "city", "town", "state",
    "province", "usa", "u.s.a.",
];

/// Lowercases, trims, and collapses interior whitespace and comma spacing.
/// Two places are semantically equivalent exactly when their normalized
/// forms are identical.
#[must_use]
pub fn normalize(place: &str) -> String {
    let mut out = String::with_capacity(place.len());
    for (i, component) in place.split(',').map(str::trim).enumerate() {
        if component.is_empty() {
            continue;
        }
        if i > 0 && !out.is_empty() {
            out.push_str(", ");
        }
        let mut first = true;
        for word in component.split_whitespace() {
            if !first {
                out.push(' ');
            }
            first = false;
            out.extend(word.chars().flat_map(char::to_lowercase));
        }
    }
    out
}

/// The comma-separated components in normalized form, most specific first.
#[must_use]
pub fn components(place: &str) -> Vec<String> {
    normalize(place)
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first non-stopword word of the place, used as a blocking token.
#[must_use]
pub fn primary_token(place: &str) -> Option<String> {
    for component in normalize(place).split(',') {
        for word in component.split_whitespace() {
            if !PLACE_STOPWORDS.contains(&word) {
                return Some(word.to_string());
            }
        }
    }
    None
}

/// Proportional overlap of the component hierarchies: the number of shared
/// components over the longer hierarchy. Exact normalized equality scores
/// 1.0 by construction.
#[must_use]
pub fn hierarchy_overlap(a: &str, b: &str) -> f64 {
    let ca = components(a);
    let cb = components(b);
    if ca.is_empty() || cb.is_empty() {
        return 0.0;
    }
    let shared = ca.iter().filter(|c| cb.contains(c)).count();
    shared as f64 / ca.len().max(cb.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  New York ,  NY "), "new york, ny");
        assert_eq!(normalize("Brooklyn,Kings,New York"), "brooklyn, kings, new york");
        assert_eq!(normalize("London"), "london");
    }

    #[test]
    fn test_normalized_equality_ignores_cosmetics() {
        assert_eq!(normalize("New  York, NY"), normalize("new york,NY"));
        assert_ne!(normalize("New York"), normalize("New York, NY"));
    }

    #[test]
    fn test_components() {
        assert_eq!(
            components("Brooklyn, Kings, New York"),
            vec!["brooklyn", "kings", "new york"]
        );
    }

    #[test]
    fn test_primary_token_skips_stopwords() {
        assert_eq!(primary_token("County Cork, Ireland"), Some("cork".to_string()));
        assert_eq!(primary_token("New York"), Some("new".to_string()));
        assert_eq!(primary_token("of the"), None);
        assert_eq!(primary_token(""), None);
    }

    #[test]
    fn test_hierarchy_overlap() {
        let full = "Brooklyn, Kings, New York";
        let partial = "Kings, New York";
        assert!(hierarchy_overlap(full, partial) > 0.6);
        assert_eq!(hierarchy_overlap(full, full), 1.0);
        assert_eq!(hierarchy_overlap(full, "Paris, France"), 0.0);
    }
}
