/// Canonical claim encoding
///
/// The signature covers these exact bytes, so the layout is frozen:
/// object keys sorted lexicographically, `", "` between items, `": "`
/// between key and value, and everything outside printable ASCII escaped
/// as lowercase `\uXXXX` (UTF-16 surrogate pairs above the BMP).
/// Verification never re-encodes; it checks the transported bytes as-is.
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io::{self, Write};

use crate::error::{LicenseError, LicenseResult};

/// Encode any serializable value canonically
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> LicenseResult<Vec<u8>> {
    // Going through Value sorts object keys (BTreeMap-backed map)
    let value = serde_json::to_value(value)
        .map_err(|e| LicenseError::EncodingError(e.to_string()))?;

    let mut out = Vec::with_capacity(512);
    let mut serializer = Serializer::with_formatter(&mut out, CanonicalFormatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| LicenseError::EncodingError(e.to_string()))?;
    Ok(out)
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        // Quotes, backslashes and C0 controls never reach here; serde_json
        // escapes them itself.
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: serde_json::Value) -> String {
        String::from_utf8(to_canonical_bytes(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_sorted_keys_and_separators() {
        let value = json!({"b": 1, "a": [true, null], "c": {"z": "x", "y": 2.5}});
        assert_eq!(
            encode(value),
            r#"{"a": [true, null], "b": 1, "c": {"y": 2.5, "z": "x"}}"#
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(encode(json!({"features": {}, "tags": []})), r#"{"features": {}, "tags": []}"#);
    }

    #[test]
    fn test_non_ascii_escaped() {
        assert_eq!(encode(json!({"client": "Café"})), r#"{"client": "Caf\u00e9"}"#);
        // Astral plane characters become surrogate pairs
        assert_eq!(encode(json!("🔒")), r#""\ud83d\udd12""#);
        assert_eq!(encode(json!("a\u{7f}b")), r#""a\u007fb""#);
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(encode(json!("line\nbreak\t\"q\"")), r#""line\nbreak\t\"q\"""#);
    }

    #[test]
    fn test_stable_across_calls() {
        let value = json!({"license_id": "x", "features": {"seats": 5}});
        assert_eq!(to_canonical_bytes(&value).unwrap(), to_canonical_bytes(&value).unwrap());
    }
}
