//! American Soundex, shared by blocking and phonetic name scoring.

/// Maps a letter to its Soundex digit; `None` for vowels and separators.
fn digit(c: u8) -> Option<u8> {
    match c {
        b'b' | b'f' | b'p' | b'v' => Some(b'1'),
        b'c' | b'g' | b'j' | b'k' | b'q' | b's' | b'x' | b'z' => Some(b'2'),
        b'd' | b't' => Some(b'3'),
        b'l' => Some(b'4'),
        b'm' | b'n' => Some(b'5'),
        b'r' => Some(b'6'),
        _ => None,
    }
}

/// Computes the four-character Soundex code of a name ("Robert" → "R163").
/// Non-ASCII characters are ignored; returns `None` when no ASCII letter
/// remains.
#[must_use]
pub fn soundex(name: &str) -> Option<String> {
    let letters: Vec<u8> = name
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    let (&first, rest) = letters.split_first()?;

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase() as char);

    // H and W are transparent: codes on both sides of them merge.
    // Vowels break the run instead.
    let mut previous = digit(first);
    for &c in rest {
        match digit(c) {
            Some(d) => {
                if previous != Some(d) {
                    code.push(d as char);
                    if code.len() == 4 {
                        break;
                    }
                }
                previous = Some(d);
            }
            None => {
                if c != b'h' && c != b'w' {
                    previous = None;
                }
            }
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}
