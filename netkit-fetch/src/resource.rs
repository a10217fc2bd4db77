//! Fetchable resources and their payload types.

use std::fmt;

use netkit_json::{JsonArray, JsonDictionary};
use serde_json::Value;

use crate::request::HttpRequest;

// ============================================================================
// Payload
// ============================================================================

/// A wire type a response body can be narrowed to.
pub trait Payload: Sized + Send + 'static {
    /// Narrows the raw body, or returns `None` if it has another shape.
    fn from_body(body: Vec<u8>) -> Option<Self>;
}

impl Payload for Vec<u8> {
    fn from_body(body: Vec<u8>) -> Option<Self> {
        Some(body)
    }
}

impl Payload for String {
    fn from_body(body: Vec<u8>) -> Option<Self> {
        String::from_utf8(body).ok()
    }
}

impl Payload for Value {
    fn from_body(body: Vec<u8>) -> Option<Self> {
        serde_json::from_slice(&body).ok()
    }
}

impl Payload for JsonDictionary {
    fn from_body(body: Vec<u8>) -> Option<Self> {
        netkit_json::parse_dictionary(&body).ok()
    }
}

impl Payload for JsonArray {
    fn from_body(body: Vec<u8>) -> Option<Self> {
        netkit_json::parse_array(&body).ok()
    }
}

impl Payload for () {
    fn from_body(body: Vec<u8>) -> Option<Self> {
        body.is_empty().then_some(())
    }
}

// ============================================================================
// Resource
// ============================================================================

/// One fetchable unit: the request to send, what comes back, and how to read
/// a domain error out of an unsuccessful response.
///
/// ## Implementing a Resource
///
/// ```ignore
/// struct Profile { id: u64 }
///
/// impl Resource for Profile {
///     type Remote = JsonDictionary;
///     type Local = User;
///     type ApiError = ApiError;
///
///     fn request(&self) -> HttpRequest {
///         HttpRequest::get(endpoint(self.id))
///     }
///
///     fn api_error(&self, remote: &JsonDictionary) -> Option<ApiError> {
///         ApiError::from_document(remote)
///     }
///
///     fn into_local(&self, remote: JsonDictionary) -> User {
///         User::from(remote)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + 'static {
    /// The wire type the response body is narrowed to.
    type Remote: Payload;
    /// The caller-facing result type.
    type Local: Send + 'static;
    /// Domain error parsed from unsuccessful responses.
    type ApiError: fmt::Debug + Send + 'static;

    /// Builds the outbound request.
    fn request(&self) -> HttpRequest;

    /// Parses a domain error from an unsuccessful response body.
    fn api_error(&self, remote: &Self::Remote) -> Option<Self::ApiError>;

    /// Converts the narrowed body into the caller-facing type.
    fn into_local(&self, remote: Self::Remote) -> Self::Local;

    /// Value delivered for `204 No Content` without reading the body.
    ///
    /// Resources whose local type is empty return `Some`; the default means
    /// a body is always expected.
    fn no_content(&self) -> Option<Self::Local> {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_and_string_payloads() {
        assert_eq!(Vec::<u8>::from_body(b"abc".to_vec()), Some(b"abc".to_vec()));
        assert_eq!(String::from_body(b"abc".to_vec()), Some("abc".to_string()));
        assert_eq!(String::from_body(vec![0xff, 0xfe]), None);
    }

    #[test]
    fn test_json_payloads() {
        assert!(JsonDictionary::from_body(br#"{"a": 1}"#.to_vec()).is_some());
        assert!(JsonDictionary::from_body(b"[1]".to_vec()).is_none());
        assert!(JsonArray::from_body(b"[1]".to_vec()).is_some());
        assert!(Value::from_body(b"oops".to_vec()).is_none());
    }

    #[test]
    fn test_unit_payload_requires_empty_body() {
        assert_eq!(<()>::from_body(Vec::new()), Some(()));
        assert_eq!(<()>::from_body(b"x".to_vec()), None);
    }
}
