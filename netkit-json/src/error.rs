//! JSON parsing error types.

use serde_json::Value;
use thiserror::Error;

use crate::value::{JsonDictionary, JsonKind};

/// Error type for JSON document and attribute parsing.
///
/// Attribute errors carry the key and the whole document they were extracted
/// from, so a caller can log exactly what the server sent.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The payload could not be deserialized at all.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The value has a different top-level shape than requested.
    #[error("Unexpected JSON type: expected {expected}, found {}", JsonKind::of(.found))]
    UnexpectedType {
        /// Name of the requested type.
        expected: &'static str,
        /// The value that was found instead.
        found: Value,
    },

    /// The raw value does not correspond to any case of the target type.
    #[error("Unexpected raw value for {type_name}: {found}")]
    UnexpectedRawValue {
        /// Name of the raw-representable target type.
        type_name: &'static str,
        /// The raw value that was found.
        found: Value,
    },

    /// The attribute exists but has the wrong shape.
    #[error(
        "Unexpected type for attribute '{key}': expected {expected}, found {}",
        JsonKind::of(.found)
    )]
    UnexpectedAttributeType {
        /// Attribute key.
        key: String,
        /// Name of the requested type.
        expected: &'static str,
        /// The value that was found.
        found: Value,
        /// The document the attribute was read from.
        document: JsonDictionary,
    },

    /// The attribute has the right shape but an invalid value.
    #[error("Unexpected value for attribute '{key}'")]
    UnexpectedAttributeValue {
        /// Attribute key.
        key: String,
        /// The document the attribute was read from.
        document: JsonDictionary,
    },

    /// The attribute is not present in the document.
    #[error("Missing attribute '{key}'")]
    MissingAttribute {
        /// Attribute key.
        key: String,
        /// The document the attribute was looked up in.
        document: JsonDictionary,
    },
}

impl JsonError {
    /// Returns the attribute key this error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnexpectedAttributeType { key, .. }
            | Self::UnexpectedAttributeValue { key, .. }
            | Self::MissingAttribute { key, .. } => Some(key),
            _ => None,
        }
    }
}
