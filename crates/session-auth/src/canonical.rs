//! Canonical form for stored credentials
//!
//! Bearer strings that pass through a naive persistence layer tend to come back
//! wrapped in quotes (`"\"abc\""`) or as the literal text of a missing value
//! (`"null"`). Every value entering or leaving the credential store goes
//! through `canonicalize`, so the rest of the client only ever sees the bare
//! token or `None`.

/// Values that mean "no credential" when found in storage.
const ABSENT_MARKERS: &[&str] = &["", "null", "undefined"];

/// Reduce a raw credential string to its canonical form.
///
/// Trims surrounding whitespace and repeatedly unwraps JSON string encoding
/// and stray single/double quotes. Returns `None` for empty values and for
/// textual absence markers.
pub fn canonicalize(raw: &str) -> Option<String> {
    let mut value = raw.trim().to_owned();

    while let Some(inner) = unwrap_layer(&value) {
        value = inner.trim().to_owned();
    }

    if ABSENT_MARKERS.contains(&value.as_str()) {
        None
    } else {
        Some(value)
    }
}

/// Form written to storage for a value (`None` removes the entry).
pub fn encode_entry(value: Option<&str>) -> Option<String> {
    value.and_then(canonicalize)
}

/// Form handed to callers for a value read back from storage.
pub fn decode_entry(stored: Option<&str>) -> Option<String> {
    stored.and_then(canonicalize)
}

/// Strip one layer of quoting, if present.
///
/// A double-quoted value is decoded as a JSON string first so escaped inner
/// quotes survive; malformed JSON falls back to dropping the outer quotes.
fn unwrap_layer(value: &str) -> Option<String> {
    if value.len() < 2 {
        return None;
    }
    if value.starts_with('"') && value.ends_with('"') {
        let decoded = serde_json::from_str::<String>(value)
            .unwrap_or_else(|_| value[1..value.len() - 1].to_owned());
        return Some(decoded);
    }
    if value.starts_with('\'') && value.ends_with('\'') {
        return Some(value[1..value.len() - 1].to_owned());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_token_is_unchanged() {
        assert_eq!(canonicalize("abc").as_deref(), Some("abc"));
    }

    #[test]
    fn strips_wrapping_double_quotes() {
        assert_eq!(canonicalize("\"abc\"").as_deref(), Some("abc"));
    }

    #[test]
    fn strips_nested_json_encoding() {
        // JSON.stringify applied twice before hitting storage
        let twice = serde_json::to_string(&serde_json::to_string("abc").unwrap()).unwrap();
        assert_eq!(canonicalize(&twice).as_deref(), Some("abc"));
    }

    #[test]
    fn strips_single_quotes_and_whitespace() {
        assert_eq!(canonicalize("  'eyJhbGci.x.y'\n").as_deref(), Some("eyJhbGci.x.y"));
    }

    #[test]
    fn absence_markers_become_none() {
        for raw in ["", "   ", "null", "undefined", "\"\"", "\"null\"", "''"] {
            assert_eq!(canonicalize(raw), None, "raw value {raw:?}");
        }
    }

    #[test]
    fn lone_quote_is_kept() {
        assert_eq!(canonicalize("\"").as_deref(), Some("\""));
    }

    #[test]
    fn malformed_json_string_still_unwraps() {
        assert_eq!(canonicalize("\"ab\\qc\"").as_deref(), Some("ab\\qc"));
    }

    #[test]
    fn decode_of_encode_matches_canonical_form() {
        for raw in ["abc", "\"abc\"", " \"'abc'\" ", "null"] {
            let stored = encode_entry(Some(raw));
            assert_eq!(decode_entry(stored.as_deref()), canonicalize(raw), "raw {raw:?}");
        }
        assert_eq!(encode_entry(None), None);
        assert_eq!(decode_entry(None), None);
    }
}
