//! Request and response values exchanged with a session.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::TransportError;
use crate::status::HttpStatus;

// ============================================================================
// HTTP Request
// ============================================================================

/// An outbound request descriptor.
///
/// Unlike `reqwest::Request` this is a plain value: it can be cloned, handed
/// to interceptors and rewritten by an authenticator before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional body bytes, sent as-is.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parses `url` and creates a GET request.
    pub fn parse_get(url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self::get(url))
    }

    /// Sets a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn with_bearer_token(self, token: &str) -> Result<Self, TransportError> {
        let value = sensitive_value(&format!("Bearer {token}"))?;
        Ok(self.with_header(header::AUTHORIZATION, value))
    }

    /// Sets `Authorization: Basic <base64(user:password)>`.
    pub fn with_basic_auth(self, user: &str, password: &str) -> Result<Self, TransportError> {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        let value = sensitive_value(&format!("Basic {encoded}"))?;
        Ok(self.with_header(header::AUTHORIZATION, value))
    }

    /// Returns the `Authorization` header, if set.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }
}

fn sensitive_value(value: &str) -> Result<HeaderValue, TransportError> {
    let mut value =
        HeaderValue::from_str(value).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

// ============================================================================
// Responses
// ============================================================================

/// Head of an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Raw status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL (after redirects).
    pub url: Url,
}

impl HttpResponse {
    /// Creates a response head with no headers.
    pub fn new(status: u16, url: Url) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            url,
        }
    }

    /// Returns the classified status.
    pub fn http_status(&self) -> HttpStatus {
        HttpStatus::from(self.status)
    }
}

/// Whatever response object the transport produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A well-formed HTTP response.
    Http(HttpResponse),
    /// A response that is not HTTP (e.g. from a `file:` or custom scheme).
    NonHttp {
        /// URL the response refers to, if known.
        url: Option<Url>,
    },
}

impl Response {
    /// Returns the HTTP response, if this is one.
    pub fn as_http(&self) -> Option<&HttpResponse> {
        match self {
            Self::Http(response) => Some(response),
            Self::NonHttp { .. } => None,
        }
    }
}

// ============================================================================
// Session Reply
// ============================================================================

/// Everything a transport task produced when it finished.
///
/// Any combination is possible, the fetch pipeline decides what it means.
#[derive(Debug, Default)]
pub struct SessionReply {
    /// Response object, if one arrived.
    pub response: Option<Response>,
    /// Body bytes, if any were read.
    pub body: Option<Vec<u8>>,
    /// Transport error, if the request failed.
    pub error: Option<TransportError>,
}

impl SessionReply {
    /// A reply carrying an HTTP response and body.
    pub fn http(response: HttpResponse, body: Option<Vec<u8>>) -> Self {
        Self {
            response: Some(Response::Http(response)),
            body,
            error: None,
        }
    }

    /// A reply carrying only a transport error.
    pub fn failed(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let request = HttpRequest::parse_get("https://example.com/me")
            .unwrap()
            .with_basic_auth("user", "pass")
            .unwrap();
        assert_eq!(request.authorization(), Some("Basic dXNlcjpwYXNz"));
        assert!(request.headers[header::AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_bearer_token_header() {
        let request = HttpRequest::parse_get("https://example.com/me")
            .unwrap()
            .with_bearer_token("abc")
            .unwrap();
        assert_eq!(request.authorization(), Some("Bearer abc"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            HttpRequest::parse_get("not a url"),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_as_http() {
        let url = Url::parse("https://example.com").unwrap();
        let response = Response::Http(HttpResponse::new(200, url));
        assert_eq!(response.as_http().map(|r| r.status), Some(200));
        assert!(Response::NonHttp { url: None }.as_http().is_none());
    }
}
