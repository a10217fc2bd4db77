//! Whole-document and single-value parsing.

use serde_json::Value;

use crate::error::JsonError;
use crate::value::{FromJson, JsonArray, JsonDictionary, RawRepresentable};

/// Deserializes a payload that must be a JSON object.
pub fn parse_dictionary(bytes: &[u8]) -> Result<JsonDictionary, JsonError> {
    match serde_json::from_slice(bytes)? {
        Value::Object(dictionary) => Ok(dictionary),
        other => Err(JsonError::UnexpectedType {
            expected: JsonDictionary::TYPE_NAME,
            found: other,
        }),
    }
}

/// Deserializes a payload that must be a JSON array.
pub fn parse_array(bytes: &[u8]) -> Result<JsonArray, JsonError> {
    match serde_json::from_slice(bytes)? {
        Value::Array(array) => Ok(array),
        other => Err(JsonError::UnexpectedType {
            expected: "array",
            found: other,
        }),
    }
}

/// Narrows a single untyped value.
pub fn parse_value<T: FromJson>(value: &Value) -> Result<T, JsonError> {
    T::from_json(value).ok_or_else(|| JsonError::UnexpectedType {
        expected: T::TYPE_NAME,
        found: value.clone(),
    })
}

/// Narrows a single untyped value into a raw-representable type.
pub fn parse_raw_value<K: RawRepresentable>(value: &Value) -> Result<K, JsonError> {
    let raw = parse_value::<K::Raw>(value)?;
    K::from_raw(raw).ok_or_else(|| JsonError::UnexpectedRawValue {
        type_name: K::type_name(),
        found: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    enum Color {
        Red,
        Blue,
    }

    impl RawRepresentable for Color {
        type Raw = String;

        fn type_name() -> &'static str {
            "Color"
        }

        fn from_raw(raw: String) -> Option<Self> {
            match raw.as_str() {
                "red" => Some(Self::Red),
                "blue" => Some(Self::Blue),
                _ => None,
            }
        }
    }

    #[test]
    fn test_parse_dictionary() {
        let doc = parse_dictionary(br#"{"a": 1, "b": 2}"#).unwrap();
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_dictionary_wrong_shape() {
        let err = parse_dictionary(b"[1, 2]").unwrap_err();
        assert!(matches!(err, JsonError::UnexpectedType { expected: "object", .. }));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_dictionary(b"{not json"),
            Err(JsonError::Serialization(_))
        ));
        assert!(matches!(parse_array(b""), Err(JsonError::Serialization(_))));
    }

    #[test]
    fn test_parse_array() {
        assert_eq!(parse_array(b"[1, true]").unwrap(), vec![json!(1), json!(true)]);
        assert!(matches!(
            parse_array(b"{}"),
            Err(JsonError::UnexpectedType { expected: "array", .. })
        ));
    }

    #[test]
    fn test_parse_raw_value() {
        assert_eq!(parse_raw_value::<Color>(&json!("red")).unwrap(), Color::Red);
        assert_eq!(parse_raw_value::<Color>(&json!("blue")).unwrap(), Color::Blue);

        let err = parse_raw_value::<Color>(&json!("green")).unwrap_err();
        assert!(matches!(err, JsonError::UnexpectedRawValue { type_name: "Color", .. }));

        let err = parse_raw_value::<Color>(&json!(7)).unwrap_err();
        assert!(matches!(err, JsonError::UnexpectedType { expected: "string", .. }));
    }
}
