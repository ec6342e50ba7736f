//! Parse and encode boundary.
//!
//! Request bodies and stored columns enter the system as JSON text and are
//! turned into [`JsonValue`] here, before any merging happens. When an object
//! repeats a key, the last occurrence wins.
//!
//! Documents nested deeper than [`MAX_NESTING_DEPTH`] are rejected on the way
//! in, so everything that can be stored can also be read back.

use crate::value::JsonValue;

/// Maximum number of nested arrays/objects in a document (100 levels)
///
/// Kept below `serde_json`'s parser recursion limit of 128.
pub const MAX_NESTING_DEPTH: usize = 100;

/// JSON text that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid JSON at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending input, 0 if unknown
    pub line: usize,
    /// 1-based column of the offending input, 0 if unknown
    pub column: usize,
    /// Parser diagnostic
    pub message: String,
}

impl ParseError {
    /// An error that has no position in the input.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            line: 0,
            column: 0,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        // serde_json appends " at line L column C"; keep only the cause.
        let message = match message.rfind(" at line ") {
            Some(idx) => message[..idx].to_string(),
            None => message,
        };
        Self {
            line: err.line(),
            column: err.column(),
            message,
        }
    }
}

/// Parse JSON text into a document.
///
/// # Errors
///
/// Returns [`ParseError`] if `text` is not a single well-formed JSON value.
pub fn parse(text: &str) -> Result<JsonValue, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    bounded(value.into())
}

/// Parse JSON bytes into a document.
///
/// # Errors
///
/// Returns [`ParseError`] if `bytes` are not UTF-8 encoded JSON.
pub fn parse_slice(bytes: &[u8]) -> Result<JsonValue, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    bounded(value.into())
}

fn bounded(document: JsonValue) -> Result<JsonValue, ParseError> {
    check_depth(&document)?;
    Ok(document)
}

/// Check that `value` nests at most [`MAX_NESTING_DEPTH`] arrays/objects.
///
/// # Errors
///
/// Returns [`ParseError`] naming the limit if the document is too deep.
pub fn check_depth(value: &JsonValue) -> Result<(), ParseError> {
    let mut pending = vec![(value, 0_usize)];

    while let Some((value, depth)) = pending.pop() {
        let depth = depth + 1;
        match value {
            JsonValue::Array(items) if depth <= MAX_NESTING_DEPTH => {
                pending.extend(items.iter().map(|item| (item, depth)));
            }
            JsonValue::Object(entries) if depth <= MAX_NESTING_DEPTH => {
                pending.extend(entries.values().map(|item| (item, depth)));
            }
            JsonValue::Array(_) | JsonValue::Object(_) => {
                return Err(ParseError::custom(format!(
                    "document nesting exceeds maximum of {MAX_NESTING_DEPTH} levels"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Compact encoding with object keys in sorted order.
#[must_use]
pub fn to_string(value: &JsonValue) -> String {
    value.to_string()
}

/// Indented encoding for human consumption.
#[must_use]
pub fn to_string_pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_last_occurrence_wins() {
        let doc = parse(r#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
        assert_eq!(doc, parse(r#"{"b": 2, "a": 3}"#).unwrap());
    }

    #[test]
    fn nested_duplicate_keys_last_occurrence_wins() {
        let doc = parse(r#"{"a": {"x": 1}, "a": {"y": null}}"#).unwrap();
        assert_eq!(doc, parse(r#"{"a": {"y": null}}"#).unwrap());
    }

    #[test]
    fn numbers_keep_their_literal_text() {
        let text = r#"{"big":123456789012345678901234567890,"pi":3.141592653589793238462643383279,"e":1.0e-7}"#;
        let doc = parse(text).unwrap();
        let encoded = to_string(&doc);
        assert!(encoded.contains("123456789012345678901234567890"));
        assert!(encoded.contains("3.141592653589793238462643383279"));
        assert!(encoded.contains("1.0e-7"));
    }

    #[test]
    fn unicode_passes_through() {
        let doc = parse(r#"{"species":"Mus musculus","note":"Ω→β é"}"#).unwrap();
        assert_eq!(doc.get("note").and_then(JsonValue::as_str), Some("Ω→β é"));
        assert_eq!(parse(&to_string(&doc)).unwrap(), doc);
    }

    #[test]
    fn rejects_malformed_text_with_position() {
        let err = parse("{\n  \"a\": }").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.column > 0);
        assert!(!err.message.contains(" at line "));
    }

    #[test]
    fn rejects_trailing_content() {
        assert!(parse(r#"{"a":1} {"b":2}"#).is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn parse_slice_rejects_invalid_utf8() {
        assert!(parse_slice(&[b'"', 0xff, b'"']).is_err());
        assert_eq!(parse_slice(b"[true]").unwrap(), JsonValue::Array(vec![true.into()]));
    }

    fn nested(levels: usize) -> JsonValue {
        (0..levels).fold(JsonValue::from(1_i64), |inner, _| {
            [("n", inner)].into_iter().collect()
        })
    }

    #[test]
    fn depth_limit_is_inclusive() {
        assert!(check_depth(&nested(MAX_NESTING_DEPTH)).is_ok());
        assert!(check_depth(&JsonValue::from("leaf")).is_ok());

        let err = check_depth(&nested(MAX_NESTING_DEPTH + 1)).unwrap_err();
        assert!(err.message.contains("nesting"));
        assert!(check_depth(&nested(300)).is_err());
    }

    #[test]
    fn parse_rejects_documents_over_the_depth_limit() {
        let at_limit = to_string(&nested(MAX_NESTING_DEPTH));
        assert_eq!(parse(&at_limit).unwrap(), nested(MAX_NESTING_DEPTH));

        let over = to_string(&nested(MAX_NESTING_DEPTH + 1));
        assert!(parse(&over).unwrap_err().message.contains("nesting"));
        assert!(parse_slice(over.as_bytes()).is_err());

        let arrays = format!("{}{}", "[".repeat(110), "]".repeat(110));
        assert!(parse(&arrays).is_err());
    }

    #[test]
    fn encoding_is_stable() {
        let a = parse(r#"{"z":1,"a":{"y":2,"b":3}}"#).unwrap();
        let b = parse(r#"{"a":{"b":3,"y":2},"z":1}"#).unwrap();
        assert_eq!(to_string(&a), to_string(&b));
        assert_eq!(to_string(&a), r#"{"a":{"b":3,"y":2},"z":1}"#);
    }

    #[test]
    fn pretty_output_parses_back() {
        let doc = parse(r#"{"a":[1,2],"b":{"c":null}}"#).unwrap();
        let pretty = to_string_pretty(&doc);
        assert!(pretty.contains('\n'));
        assert_eq!(parse(&pretty).unwrap(), doc);
    }
}
