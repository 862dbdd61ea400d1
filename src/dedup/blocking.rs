//! Blocking: partitioning individuals into buckets of likely matches.
//!
//! All-pairs comparison is quadratic; blocking reduces the candidate
//! space to near-linear by only pairing individuals that share at least
//! one block key. Key families, in priority order:
//!
//! 1. primary: surname soundex + birth year, expanded ±1 and ±2 years
//! 2. bucket: surname soundex + five-year bucket, for imprecise years
//! 3. initial: surname soundex + given initial (year missing)
//! 4. given2: surname soundex + two-letter given prefix (year missing)
//! 5. place: four-letter surname prefix + birth place token (year missing)
//! 6. rescue: given(3) + surname(3) + place token, only when families
//!    1–5 produced nothing for the individual
//!
//! Oversized blocks are dropped whole; their members stay reachable
//! through their other keys.

use crate::dedup::similarity::PersonFacts;
use crate::dedup::soundex::soundex;
use crate::dedup::DedupConfig;
use crate::types::place;
use std::collections::HashMap;
use tracing::warn;

/// Surname particles skipped when picking the soundex root.
const SURNAME_PREFIXES: [&str; 11] = [
    "van", "von", "de", "del", "dela", "der", "den", "du", "le", "la", "les",
];

/// The soundex root of a surname: the remainder after leading particles.
pub(crate) fn surname_root(surname: &str) -> Option<String> {
    let root: Vec<&str> = surname
        .split_whitespace()
        .skip_while(|token| SURNAME_PREFIXES.contains(&token.to_lowercase().as_str()))
        .collect();
    if root.is_empty() {
        // A name that is nothing but particles ("De La") keeps itself.
        let fallback = surname.split_whitespace().last()?;
        return Some(fallback.to_lowercase());
    }
    Some(root.join(" ").to_lowercase())
}

fn prefix(text: &str, len: usize) -> Option<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.chars().take(len).collect())
    }
}

/// Computes the block keys of one person.
pub(crate) fn block_keys(facts: &PersonFacts) -> Vec<String> {
    let mut keys = Vec::new();

    let surname_soundex = facts
        .surname
        .as_deref()
        .and_then(surname_root)
        .and_then(|root| soundex(&root));
    let year = facts.birth_year;
    let imprecise = facts
        .birth_year_range
        .is_some_and(|(lo, hi)| hi > lo);
    let place_token = facts.birth_place.as_deref().and_then(place::primary_token);

    // 1. primary: soundex + year, with ±1/±2 expansion recovering
    //    approximate dates.
    if let (Some(sx), Some(year)) = (&surname_soundex, year) {
        for offset in -2i32..=2 {
            keys.push(format!("p:{sx}:{}", year + offset));
        }

        // 2. five-year bucket when the year itself is uncertain.
        if imprecise {
            keys.push(format!("b:{sx}:{}", year.div_euclid(5) * 5));
        }
    }

    if year.is_none() {
        if let Some(sx) = &surname_soundex {
            // 3. soundex + given initial.
            if let Some(initial) = facts.given.as_deref().and_then(|g| prefix(g, 1)) {
                keys.push(format!("i:{sx}:{initial}"));
            }
            // 4. soundex + two-letter given prefix.
            if let Some(given2) = facts.given.as_deref().and_then(|g| prefix(g, 2)) {
                keys.push(format!("g:{sx}:{given2}"));
            }
        }
        // 5. surname prefix + place token.
        if let (Some(surname4), Some(token)) = (
            facts.surname.as_deref().and_then(|s| prefix(s, 4)),
            &place_token,
        ) {
            keys.push(format!("s:{surname4}:{token}"));
        }
    }

    // 6. rescue, only for people families 1-5 left unkeyed.
    if keys.is_empty() {
        if let (Some(given3), Some(surname3), Some(token)) = (
            facts.given.as_deref().and_then(|g| prefix(g, 3)),
            facts.surname.as_deref().and_then(|s| prefix(s, 3)),
            &place_token,
        ) {
            keys.push(format!("r:{given3}:{surname3}:{token}"));
        }
    }

    keys
}

/// The key-family label of a block key, for metrics.
pub(crate) fn key_family(key: &str) -> &'static str {
    match key.as_bytes().first() {
        Some(b'p') => "primary",
        Some(b'b') => "bucket",
        Some(b'i') => "initial",
        Some(b'g') => "given-prefix",
        Some(b's') => "surname-place",
        Some(b'r') => "rescue",
        _ => "other",
    }
}

/// Groups person indexes by block key, dropping oversized blocks. Returns
/// blocks in sorted key order for deterministic pair emission.
pub(crate) fn build_blocks(
    people: &[PersonFacts],
    config: &DedupConfig,
) -> (Vec<(String, Vec<usize>)>, BlockingSummary) {
    let mut blocks: HashMap<String, Vec<usize>> = HashMap::new();
    let mut keyed_people = 0usize;

    for (index, facts) in people.iter().enumerate() {
        let keys = block_keys(facts);
        if !keys.is_empty() {
            keyed_people += 1;
        }
        for key in keys {
            blocks.entry(key).or_default().push(index);
        }
    }

    let mut skipped = 0usize;
    let mut retained: Vec<(String, Vec<usize>)> = Vec::with_capacity(blocks.len());
    for (key, members) in blocks {
        // Singleton blocks pair nothing; they only count for coverage.
        if members.len() > config.max_block_size {
            warn!(
                key = %key,
                population = members.len(),
                cap = config.max_block_size,
                "oversized block skipped"
            );
            skipped += 1;
            continue;
        }
        retained.push((key, members));
    }
    retained.sort_by(|a, b| a.0.cmp(&b.0));

    let summary = BlockingSummary {
        keyed_people,
        skipped_blocks: skipped,
    };
    (retained, summary)
}

/// Coverage numbers produced while building blocks.
pub(crate) struct BlockingSummary {
    pub keyed_people: usize,
    pub skipped_blocks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::individual::gender::Sex;

    fn facts(
        given: &str,
        surname: &str,
        year: Option<i32>,
        place_name: Option<&str>,
    ) -> PersonFacts {
        PersonFacts {
            name_lower: format!("{given} {surname}").to_lowercase(),
            given: Some(given.to_lowercase()),
            surname: Some(surname.to_lowercase()),
            sex: Sex::Unknown,
            birth_year: year,
            birth_year_range: year.map(|y| (y, y)),
            birth_place: place_name.map(str::to_string),
        }
    }

    #[test]
    fn test_surname_root_strips_particles() {
        assert_eq!(surname_root("van der Berg").as_deref(), Some("berg"));
        assert_eq!(surname_root("De La Cruz").as_deref(), Some("cruz"));
        assert_eq!(surname_root("Smith").as_deref(), Some("smith"));
        assert_eq!(surname_root("de la").as_deref(), Some("la"));
    }

    #[test]
    fn test_primary_keys_with_expansion() {
        let keys = block_keys(&facts("John", "Doe", Some(1900), None));
        let primary: Vec<&String> = keys.iter().filter(|k| k.starts_with("p:")).collect();
        assert_eq!(primary.len(), 5); // 1898..=1902
        assert!(keys.iter().any(|k| k.ends_with(":1900")));
        assert!(keys.iter().any(|k| k.ends_with(":1898")));
        assert!(keys.iter().any(|k| k.ends_with(":1902")));
    }

    #[test]
    fn test_bucket_key_only_for_imprecise_years() {
        let exact = block_keys(&facts("John", "Doe", Some(1900), None));
        assert!(!exact.iter().any(|k| k.starts_with("b:")));

        let mut imprecise = facts("John", "Doe", Some(1900), None);
        imprecise.birth_year_range = Some((1898, 1902));
        let keys = block_keys(&imprecise);
        assert!(keys.iter().any(|k| k.starts_with("b:") && k.ends_with(":1900")));
    }

    #[test]
    fn test_fallback_keys_when_year_missing() {
        let keys = block_keys(&facts("John", "Doe", None, Some("Boston")));
        assert!(keys.iter().any(|k| k.starts_with("i:")));
        assert!(keys.iter().any(|k| k.starts_with("g:")));
        assert!(keys.iter().any(|k| k == "s:doe:boston"));
        // Families 3-5 fired, so no rescue key.
        assert!(!keys.iter().any(|k| k.starts_with("r:")));
    }

    #[test]
    fn test_rescue_key_is_last_resort() {
        // A known year but no soundexable surname leaves families 1-5
        // empty; the rescue family keys on name prefixes + place.
        let person = PersonFacts {
            name_lower: "иван петров".to_string(),
            given: Some("иван".to_string()),
            surname: Some("петров".to_string()),
            sex: Sex::Unknown,
            birth_year: Some(1900),
            birth_year_range: Some((1900, 1900)),
            birth_place: Some("Minsk".to_string()),
        };
        let keys = block_keys(&person);
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("r:"));

        // With a soundexable surname the rescue family stays silent.
        let keyed = facts("John", "Doe", Some(1900), Some("Minsk"));
        assert!(!block_keys(&keyed).iter().any(|k| k.starts_with("r:")));
    }

    #[test]
    fn test_same_year_same_surname_share_primary_key() {
        let a = block_keys(&facts("John", "Doe", Some(1850), None));
        let b = block_keys(&facts("Jon", "Doe", Some(1851), None));
        assert!(a.iter().any(|k| b.contains(k)));
    }

    #[test]
    fn test_oversized_blocks_are_skipped() {
        let people: Vec<PersonFacts> = (0..10)
            .map(|i| facts(&format!("P{i}"), "Doe", Some(1900), None))
            .collect();
        let config = DedupConfig {
            max_block_size: 5,
            ..DedupConfig::default()
        };
        let (blocks, summary) = build_blocks(&people, &config);
        assert!(summary.skipped_blocks > 0);
        assert!(blocks.iter().all(|(_, members)| members.len() <= 5));
    }
}
