//! Character encoding detection and decoding for GEDCOM files.
//!
//! GEDCOM 5.5.1 declares its encoding in the header (`HEAD`/`CHAR`), with a
//! BOM taking precedence when present. UTF-8 and UTF-16 decode natively;
//! ASCII and ANSI decode through Windows-1252; ANSEL is recognized and
//! decoded best-effort. An unknown declaration downgrades to a warning and
//! the bytes are treated as UTF-8 best-effort.

use crate::diagnostics::{Diagnostic, Severity};
use crate::GedcomError;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// The detected or declared encoding of a GEDCOM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GedcomEncoding {
    /// UTF-8, the recommended modern encoding.
    Utf8,
    /// UTF-16 little endian (declared `UNICODE`, or LE BOM).
    Utf16Le,
    /// UTF-16 big endian (BE BOM).
    Utf16Be,
    /// 7-bit ASCII, a subset of UTF-8.
    Ascii,
    /// ANSI (Windows-1252), common in files from older Windows software.
    Ansi,
    /// ANSEL (Z39.47), the legacy GEDCOM 5.x encoding.
    Ansel,
    /// Declared but unrecognized; decoded as UTF-8 best-effort.
    Unknown,
}

impl std::fmt::Display for GedcomEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GedcomEncoding::Utf8 => write!(f, "UTF-8"),
            GedcomEncoding::Utf16Le => write!(f, "UTF-16LE"),
            GedcomEncoding::Utf16Be => write!(f, "UTF-16BE"),
            GedcomEncoding::Ascii => write!(f, "ASCII"),
            GedcomEncoding::Ansi => write!(f, "ANSI"),
            GedcomEncoding::Ansel => write!(f, "ANSEL"),
            GedcomEncoding::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Detects the encoding of a GEDCOM byte stream by examining:
/// 1. a leading Byte Order Mark,
/// 2. the `CHAR` declaration in the header.
///
/// Without either, UTF-8 (or ASCII when all bytes are 7-bit) is assumed.
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> GedcomEncoding {
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        return GedcomEncoding::Utf8;
    }
    if bytes.len() >= 2 {
        if bytes[0] == 0xFF && bytes[1] == 0xFE {
            return GedcomEncoding::Utf16Le;
        }
        if bytes[0] == 0xFE && bytes[1] == 0xFF {
            return GedcomEncoding::Utf16Be;
        }
    }

    if let Some(encoding) = detect_from_char_tag(bytes) {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        if bytes.iter().all(|&b| b < 128) {
            GedcomEncoding::Ascii
        } else {
            GedcomEncoding::Utf8
        }
    } else {
        GedcomEncoding::Unknown
    }
}

/// Scans the first lines of the header for a `CHAR` declaration.
fn detect_from_char_tag(bytes: &[u8]) -> Option<GedcomEncoding> {
    // The header is ASCII-compatible in every supported encoding except
    // UTF-16, which is handled by BOM above. A lossy Windows-1252 view of
    // the first 4 KiB is enough to find the declaration.
    let sample = &bytes[..bytes.len().min(4096)];
    let (decoded, _, _) = WINDOWS_1252.decode(sample);

    for line in decoded.lines().take(64) {
        let mut fields = line.split_whitespace();
        let Some(level) = fields.next() else {
            continue;
        };
        let Some(tag) = fields.next() else {
            continue;
        };
        // Records after the header no longer declare encodings.
        if level == "0" && tag != "HEAD" {
            break;
        }
        if tag == "CHAR" {
            return Some(parse_declared_encoding(fields.next().unwrap_or("")));
        }
    }
    None
}

/// Maps a `CHAR` declaration value to an encoding. Unrecognized values map
/// to [`GedcomEncoding::Unknown`] rather than failing.
#[must_use]
pub fn parse_declared_encoding(value: &str) -> GedcomEncoding {
    match value.to_uppercase().as_str() {
        "UTF-8" | "UTF8" => GedcomEncoding::Utf8,
        "UNICODE" | "UTF-16" | "UTF16" => GedcomEncoding::Utf16Le,
        "ASCII" => GedcomEncoding::Ascii,
        "ANSI" => GedcomEncoding::Ansi,
        "ANSEL" => GedcomEncoding::Ansel,
        _ => GedcomEncoding::Unknown,
    }
}

/// Decodes a GEDCOM byte stream, detecting its encoding first.
///
/// Returns the decoded text, the encoding that was applied, and any
/// diagnostics raised along the way (unknown declarations, lossy decodes).
///
/// # Errors
///
/// Returns `GedcomError::EncodingError` only for byte streams that cannot
/// be decoded at all (truncated UTF-16 code units).
pub fn decode(bytes: &[u8]) -> Result<(String, GedcomEncoding, Vec<Diagnostic>), GedcomError> {
    let encoding = detect_encoding(bytes);
    let mut diagnostics = Vec::new();

    let text = match encoding {
        GedcomEncoding::Utf8 | GedcomEncoding::Ascii => {
            let body = strip_utf8_bom(bytes);
            match std::str::from_utf8(body) {
                Ok(s) => s.to_string(),
                Err(_) => {
                    diagnostics.push(lossy_warning("UTF-8"));
                    String::from_utf8_lossy(body).into_owned()
                }
            }
        }
        GedcomEncoding::Utf16Le => decode_utf16(bytes, UTF_16LE)?,
        GedcomEncoding::Utf16Be => decode_utf16(bytes, UTF_16BE)?,
        GedcomEncoding::Ansi => {
            let (decoded, _, had_errors) = WINDOWS_1252.decode(bytes);
            if had_errors {
                diagnostics.push(lossy_warning("ANSI"));
            }
            decoded.into_owned()
        }
        GedcomEncoding::Ansel => {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                line: None,
                message: "ANSEL encoding decoded best-effort; combining marks may be \
                          approximated"
                    .to_string(),
            });
            decode_ansel(bytes)
        }
        GedcomEncoding::Unknown => {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                line: None,
                message: "Unknown or undeclared encoding; treating bytes as UTF-8".to_string(),
            });
            String::from_utf8_lossy(bytes).into_owned()
        }
    };

    Ok((text, encoding, diagnostics))
}

fn lossy_warning(name: &str) -> Diagnostic {
    Diagnostic {
        severity: Severity::Warning,
        line: None,
        message: format!("Invalid {name} byte sequences replaced during decoding"),
    }
}

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        &bytes[3..]
    } else {
        bytes
    }
}

fn decode_utf16(bytes: &[u8], encoding: &'static Encoding) -> Result<String, GedcomError> {
    let body = if bytes.len() >= 2
        && ((bytes[0] == 0xFF && bytes[1] == 0xFE) || (bytes[0] == 0xFE && bytes[1] == 0xFF))
    {
        &bytes[2..]
    } else {
        bytes
    };

    if body.len() % 2 != 0 {
        return Err(GedcomError::EncodingError(format!(
            "Truncated {} stream: odd byte length",
            encoding.name()
        )));
    }

    let (decoded, _, had_errors) = encoding.decode(body);
    if had_errors {
        return Err(GedcomError::EncodingError(format!(
            "Invalid {} sequence",
            encoding.name()
        )));
    }
    Ok(decoded.into_owned())
}

/// Best-effort ANSEL decoding: ASCII passes through, the common special
/// characters map to Unicode, combining-mark bytes are dropped with the
/// base character preserved. Full Z39.47 fidelity is not a goal; the
/// warning attached by [`decode`] tells callers the decode was lossy.
fn decode_ansel(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for &byte in bytes {
        if byte < 0x80 {
            result.push(byte as char);
        } else if let Some(ch) = ansel_special_char(byte) {
            result.push(ch);
        } else if (0xE0..=0xFE).contains(&byte) {
            // Combining diacritic; the base letter that follows carries
            // the meaning, the mark itself is dropped.
        } else {
            result.push('\u{FFFD}');
        }
    }
    result
}

/// The ANSEL special-character range actually seen in genealogy files.
fn ansel_special_char(byte: u8) -> Option<char> {
    match byte {
        0xA1 => Some('\u{0141}'), // Ł
        0xA2 => Some('\u{00D8}'), // Ø
        0xA3 => Some('\u{0110}'), // Đ
        0xA4 => Some('\u{00DE}'), // Þ
        0xA5 => Some('\u{00C6}'), // Æ
        0xA6 => Some('\u{0152}'), // Œ
        0xB1 => Some('\u{0142}'), // ł
        0xB2 => Some('\u{00F8}'), // ø
        0xB3 => Some('\u{0111}'), // đ
        0xB4 => Some('\u{00FE}'), // þ
        0xB5 => Some('\u{00E6}'), // æ
        0xB6 => Some('\u{0153}'), // œ
        0xB9 => Some('\u{00A3}'), // £
        0xBA => Some('\u{00F0}'), // ð
        0xC7 => Some('\u{00DF}'), // ß
        0xC8 => Some('\u{20AC}'), // €
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'0', b' ', b'H', b'E', b'A', b'D'];
        assert_eq!(detect_encoding(&bytes), GedcomEncoding::Utf8);
    }

    #[test]
    fn test_detect_utf16_le_bom() {
        let bytes = [0xFF, 0xFE, b'0', 0x00, b' ', 0x00];
        assert_eq!(detect_encoding(&bytes), GedcomEncoding::Utf16Le);
    }

    #[test]
    fn test_detect_utf16_be_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'0', 0x00, b' '];
        assert_eq!(detect_encoding(&bytes), GedcomEncoding::Utf16Be);
    }

    #[test]
    fn test_detect_from_char_tag() {
        let bytes = b"0 HEAD\n1 CHAR ANSEL\n0 TRLR\n";
        assert_eq!(detect_encoding(bytes), GedcomEncoding::Ansel);
        let bytes = b"0 HEAD\n1 CHAR UNICODE\n0 TRLR\n";
        assert_eq!(detect_encoding(bytes), GedcomEncoding::Utf16Le);
        let bytes = b"0 HEAD\n1 CHAR ANSI\n0 TRLR\n";
        assert_eq!(detect_encoding(bytes), GedcomEncoding::Ansi);
    }

    #[test]
    fn test_detect_plain_ascii() {
        let bytes = b"0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 TRLR\n";
        assert_eq!(detect_encoding(bytes), GedcomEncoding::Ascii);
    }

    #[test]
    fn test_decode_utf8() {
        let bytes = "0 HEAD\n1 CHAR UTF-8\n1 NAME Jos\u{e9} Garc\u{ed}a\n0 TRLR\n".as_bytes();
        let (content, encoding, diags) = decode(bytes).unwrap();
        assert_eq!(encoding, GedcomEncoding::Utf8);
        assert!(content.contains("Jos\u{e9} Garc\u{ed}a"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_decode_utf16_le() {
        let content = "0 HEAD\n1 CHAR UNICODE\n0 TRLR\n";
        let mut bytes = vec![0xFF, 0xFE];
        for c in content.encode_utf16() {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
        let (decoded, encoding, _) = decode(&bytes).unwrap();
        assert_eq!(encoding, GedcomEncoding::Utf16Le);
        assert!(decoded.contains("HEAD"));
    }

    #[test]
    fn test_decode_utf16_be() {
        let content = "0 HEAD\n0 TRLR\n";
        let mut bytes = vec![0xFE, 0xFF];
        for c in content.encode_utf16() {
            bytes.extend_from_slice(&c.to_be_bytes());
        }
        let (decoded, encoding, _) = decode(&bytes).unwrap();
        assert_eq!(encoding, GedcomEncoding::Utf16Be);
        assert!(decoded.contains("HEAD"));
    }

    #[test]
    fn test_decode_ansi() {
        // "José" in Windows-1252: é = 0xE9
        let bytes = b"0 HEAD\n1 CHAR ANSI\n1 NAME Jos\xE9\n0 TRLR\n";
        let (content, encoding, _) = decode(bytes).unwrap();
        assert_eq!(encoding, GedcomEncoding::Ansi);
        assert!(content.contains("Jos\u{e9}"));
    }

    #[test]
    fn test_decode_ansel_special_chars() {
        let mut bytes = b"0 HEAD\n1 CHAR ANSEL\n1 NAME ".to_vec();
        bytes.extend_from_slice(&[0xA1, 0xB2]); // Ł, ø
        bytes.extend_from_slice(b"\n0 TRLR\n");
        let (content, encoding, diags) = decode(&bytes).unwrap();
        assert_eq!(encoding, GedcomEncoding::Ansel);
        assert!(content.contains("\u{141}\u{f8}"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_unknown_declaration_warns_and_decodes() {
        let bytes = b"0 HEAD\n1 CHAR EBCDIC\n0 TRLR\n";
        let (content, encoding, diags) = decode(bytes).unwrap();
        assert_eq!(encoding, GedcomEncoding::Unknown);
        assert!(content.contains("TRLR"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn test_truncated_utf16_is_an_error() {
        let bytes = [0xFF, 0xFE, 0x41];
        assert!(decode(&bytes).is_err());
    }
}
