//! Typed attribute extraction from JSON objects.
//!
//! [`JsonParser`] reads single attributes out of a [`JsonDictionary`],
//! narrowing them to a concrete type and optionally validating them.
//!
//! ## Error precedence
//!
//! A parser may carry an *API error extractor*: a function that looks at the
//! whole document and returns a domain error when the server answered with an
//! error object instead of the expected payload. The extractor is consulted
//! only when
//!
//! - a required attribute is missing,
//! - an optional attribute is missing,
//! - an attribute is present but has the wrong shape.
//!
//! Predicate failures, unknown raw values and dates the formatter rejects are
//! always reported as [`JsonError::UnexpectedAttributeValue`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::JsonError;
use crate::value::{FromJson, JsonDictionary, RawRepresentable};

type ApiErrorExtractor<'a, E> = Box<dyn Fn(&JsonDictionary) -> Option<E> + 'a>;

// ============================================================================
// Free Functions
// ============================================================================

/// Extracts a required attribute.
///
/// ```ignore
/// let age: i64 = parse_attribute("age", &document)?;
/// ```
pub fn parse_attribute<T: FromJson>(key: &str, document: &JsonDictionary) -> Result<T, JsonError> {
    JsonParser::new(document).attribute(key)
}

/// Extracts an optional attribute.
pub fn parse_optional_attribute<T: FromJson>(
    key: &str,
    document: &JsonDictionary,
) -> Result<Option<T>, JsonError> {
    JsonParser::new(document).optional_attribute(key)
}

// ============================================================================
// JSON Parser
// ============================================================================

/// Attribute parser over a single JSON object.
///
/// `E` is the error type returned by every extraction. Without an API error
/// extractor it is simply [`JsonError`].
pub struct JsonParser<'a, E = JsonError> {
    document: &'a JsonDictionary,
    api_error: Option<ApiErrorExtractor<'a, E>>,
}

impl<'a> JsonParser<'a, JsonError> {
    /// Creates a parser without an API error extractor.
    pub fn new(document: &'a JsonDictionary) -> Self {
        Self {
            document,
            api_error: None,
        }
    }
}

impl<'a, E: From<JsonError>> JsonParser<'a, E> {
    /// Creates a parser returning `E` without an API error extractor.
    pub fn plain(document: &'a JsonDictionary) -> Self {
        Self {
            document,
            api_error: None,
        }
    }

    /// Creates a parser that substitutes domain errors found in the document.
    pub fn with_api_error<F>(document: &'a JsonDictionary, extractor: F) -> Self
    where
        F: Fn(&JsonDictionary) -> Option<E> + 'a,
    {
        Self {
            document,
            api_error: Some(Box::new(extractor)),
        }
    }

    /// Returns the underlying document.
    pub fn document(&self) -> &'a JsonDictionary {
        self.document
    }

    // ------------------------------------------------------------------------
    // Typed
    // ------------------------------------------------------------------------

    /// Extracts a required attribute.
    pub fn attribute<T: FromJson>(&self, key: &str) -> Result<T, E> {
        self.attribute_where(key, |_| true)
    }

    /// Extracts a required attribute that must satisfy `predicate`.
    pub fn attribute_where<T, P>(&self, key: &str, predicate: P) -> Result<T, E>
    where
        T: FromJson,
        P: FnOnce(&T) -> bool,
    {
        match self.document.get(key) {
            Some(value) => self.narrow(key, value, predicate),
            None => Err(self.api_error_or(|| JsonError::MissingAttribute {
                key: key.to_owned(),
                document: self.document.clone(),
            })),
        }
    }

    /// Extracts an optional attribute.
    ///
    /// A missing key (or an explicit `null`) yields `Ok(None)` unless the API
    /// error extractor finds an error in the document.
    pub fn optional_attribute<T: FromJson>(&self, key: &str) -> Result<Option<T>, E> {
        self.optional_attribute_where(key, |_| true)
    }

    /// Extracts an optional attribute that, when present, must satisfy `predicate`.
    pub fn optional_attribute_where<T, P>(&self, key: &str, predicate: P) -> Result<Option<T>, E>
    where
        T: FromJson,
        P: FnOnce(&T) -> bool,
    {
        match self.document.get(key).filter(|value| !value.is_null()) {
            Some(value) => self.narrow(key, value, predicate).map(Some),
            None => match self.extract_api_error() {
                Some(error) => Err(error),
                None => Ok(None),
            },
        }
    }

    // ------------------------------------------------------------------------
    // Raw representable
    // ------------------------------------------------------------------------

    /// Extracts a required raw-representable attribute.
    pub fn raw_attribute<K: RawRepresentable>(&self, key: &str) -> Result<K, E> {
        self.raw_attribute_where(key, |_| true)
    }

    /// Extracts a required raw-representable attribute whose raw value must
    /// satisfy `predicate`.
    pub fn raw_attribute_where<K, P>(&self, key: &str, predicate: P) -> Result<K, E>
    where
        K: RawRepresentable,
        P: FnOnce(&K::Raw) -> bool,
    {
        let raw = self.attribute_where::<K::Raw, _>(key, predicate)?;
        K::from_raw(raw).ok_or_else(|| self.unexpected_value(key))
    }

    /// Extracts an optional raw-representable attribute.
    pub fn optional_raw_attribute<K: RawRepresentable>(&self, key: &str) -> Result<Option<K>, E> {
        self.optional_raw_attribute_where(key, |_| true)
    }

    /// Extracts an optional raw-representable attribute whose raw value, when
    /// present, must satisfy `predicate`.
    pub fn optional_raw_attribute_where<K, P>(&self, key: &str, predicate: P) -> Result<Option<K>, E>
    where
        K: RawRepresentable,
        P: FnOnce(&K::Raw) -> bool,
    {
        match self.optional_attribute_where::<K::Raw, _>(key, predicate)? {
            Some(raw) => K::from_raw(raw)
                .map(Some)
                .ok_or_else(|| self.unexpected_value(key)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------------
    // Dates
    // ------------------------------------------------------------------------

    /// Extracts a required date, reading a `T` and converting it with `formatter`.
    ///
    /// See [`crate::formatters`] for common formatters.
    pub fn date_attribute<T, F>(&self, key: &str, formatter: F) -> Result<DateTime<Utc>, E>
    where
        T: FromJson,
        F: FnOnce(T) -> Option<DateTime<Utc>>,
    {
        let value = self.attribute::<T>(key)?;
        formatter(value).ok_or_else(|| self.unexpected_value(key))
    }

    /// Extracts an optional date.
    pub fn optional_date_attribute<T, F>(
        &self,
        key: &str,
        formatter: F,
    ) -> Result<Option<DateTime<Utc>>, E>
    where
        T: FromJson,
        F: FnOnce(T) -> Option<DateTime<Utc>>,
    {
        match self.optional_attribute::<T>(key)? {
            Some(value) => formatter(value)
                .map(Some)
                .ok_or_else(|| self.unexpected_value(key)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Type check, API error override, then predicate.
    fn narrow<T, P>(&self, key: &str, value: &Value, predicate: P) -> Result<T, E>
    where
        T: FromJson,
        P: FnOnce(&T) -> bool,
    {
        let Some(parsed) = T::from_json(value) else {
            return Err(self.api_error_or(|| JsonError::UnexpectedAttributeType {
                key: key.to_owned(),
                expected: T::TYPE_NAME,
                found: value.clone(),
                document: self.document.clone(),
            }));
        };

        if predicate(&parsed) {
            Ok(parsed)
        } else {
            Err(self.unexpected_value(key))
        }
    }

    fn extract_api_error(&self) -> Option<E> {
        self.api_error
            .as_ref()
            .and_then(|extractor| extractor(self.document))
    }

    fn api_error_or(&self, fallback: impl FnOnce() -> JsonError) -> E {
        match self.extract_api_error() {
            Some(api_error) => {
                debug!("Document carries an API error, reporting it instead");
                api_error
            }
            None => E::from(fallback()),
        }
    }

    fn unexpected_value(&self, key: &str) -> E {
        E::from(JsonError::UnexpectedAttributeValue {
            key: key.to_owned(),
            document: self.document.clone(),
        })
    }
}

impl<E> std::fmt::Debug for JsonParser<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonParser")
            .field("document", &self.document)
            .field("has_api_error", &self.api_error.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> JsonDictionary {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_required_attribute() {
        let document = doc(json!({"age": 30}));
        assert_eq!(parse_attribute::<i64>("age", &document).unwrap(), 30);
    }

    #[test]
    fn test_required_missing() {
        let document = doc(json!({"name": "a"}));
        let err = parse_attribute::<i64>("age", &document).unwrap_err();
        assert!(matches!(err, JsonError::MissingAttribute { ref key, .. } if key == "age"));
    }

    #[test]
    fn test_required_wrong_type() {
        let document = doc(json!({"age": "30"}));
        let err = parse_attribute::<i64>("age", &document).unwrap_err();
        assert!(matches!(
            err,
            JsonError::UnexpectedAttributeType { expected: "i64", ref found, .. } if *found == json!("30")
        ));
    }

    #[test]
    fn test_required_null_is_wrong_type() {
        let document = doc(json!({"age": null}));
        let err = parse_attribute::<i64>("age", &document).unwrap_err();
        assert!(matches!(err, JsonError::UnexpectedAttributeType { .. }));
    }

    #[test]
    fn test_predicate_failure() {
        let document = doc(json!({"age": -1}));
        let err = JsonParser::new(&document)
            .attribute_where("age", |age: &i64| *age >= 0)
            .unwrap_err();
        assert!(matches!(err, JsonError::UnexpectedAttributeValue { ref key, .. } if key == "age"));
    }

    #[test]
    fn test_optional_missing_and_null() {
        let document = doc(json!({"nick": null}));
        assert_eq!(parse_optional_attribute::<String>("nick", &document).unwrap(), None);
        assert_eq!(parse_optional_attribute::<String>("other", &document).unwrap(), None);
    }

    #[test]
    fn test_optional_present() {
        let document = doc(json!({"nick": "bob"}));
        assert_eq!(
            parse_optional_attribute::<String>("nick", &document).unwrap(),
            Some("bob".to_string())
        );
    }

    #[test]
    fn test_optional_wrong_type_is_error() {
        let document = doc(json!({"nick": 1}));
        assert!(matches!(
            parse_optional_attribute::<String>("nick", &document),
            Err(JsonError::UnexpectedAttributeType { .. })
        ));
    }

    #[test]
    fn test_date_formatter_rejects() {
        let document = doc(json!({"at": "yesterday"}));
        let err = JsonParser::new(&document)
            .date_attribute("at", |s: String| crate::formatters::rfc3339(&s))
            .unwrap_err();
        assert!(matches!(err, JsonError::UnexpectedAttributeValue { .. }));
    }

    #[test]
    fn test_optional_date_missing() {
        let document = doc(json!({}));
        let date = JsonParser::new(&document)
            .optional_date_attribute("at", crate::formatters::unix_seconds)
            .unwrap();
        assert!(date.is_none());
    }
}
