//! Fetch error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::status::HttpStatus;

/// Boxed error produced by collaborators (authenticators, custom sessions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Network Error
// ============================================================================

/// Terminal error of a fetch.
///
/// `E` is the resource's domain error, parsed out of an unsuccessful
/// response body.
#[derive(Debug, Error)]
pub enum NetworkError<E: fmt::Debug> {
    /// The transport failed before a response arrived.
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    /// The transport produced something that is not an HTTP response.
    #[error("Bad response: not an HTTP response")]
    BadResponse,

    /// Successful status, but the body is missing or has the wrong shape.
    #[error("No data in successful response")]
    NoData,

    /// Unsuccessful status code.
    #[error("HTTP error: {status}")]
    Http {
        /// The response status.
        status: HttpStatus,
        /// Domain error parsed from the body, if any.
        api_error: Option<E>,
    },

    /// Authentication failed or could not be refreshed.
    #[error("Authenticator error: {0}")]
    Authenticator(#[source] AuthenticatorError),
}

impl<E: fmt::Debug> NetworkError<E> {
    /// Returns the HTTP status for [`NetworkError::Http`].
    pub fn status(&self) -> Option<HttpStatus> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the parsed domain error for [`NetworkError::Http`].
    pub fn api_error(&self) -> Option<&E> {
        match self {
            Self::Http { api_error, .. } => api_error.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// Error raised by a [`Session`](crate::session::Session) before a response
/// was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request error from the HTTP client.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Could not connect to the host.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request could not be converted for the transport.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An identity challenge was cancelled by its handler.
    #[error("Authentication challenge cancelled for {0}")]
    ChallengeCancelled(String),

    /// The fetch ended without a result.
    #[error("Request cancelled")]
    Cancelled,
}

// ============================================================================
// Authenticator Error
// ============================================================================

/// Error produced by the authentication step of a fetch.
#[derive(Debug, Error)]
pub enum AuthenticatorError {
    /// The authenticator could not produce an authenticated request.
    #[error("Authentication rejected: {0}")]
    Rejected(#[source] BoxError),

    /// The authenticator kept reporting invalid credentials.
    #[error("Re-authentication limit reached after {attempts} attempts")]
    RetryLimitExceeded {
        /// Number of re-authentications performed.
        attempts: u32,
    },
}

// ============================================================================
// Config Error
// ============================================================================

/// Error building a [`NetworkStack`](crate::stack::NetworkStack) or loading
/// its settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A setting has an invalid value.
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_accessors() {
        let err: NetworkError<String> = NetworkError::Http {
            status: HttpStatus::from(404),
            api_error: Some("not found".to_string()),
        };
        assert_eq!(err.status(), Some(HttpStatus::ClientError(404)));
        assert_eq!(err.api_error().map(String::as_str), Some("not found"));
        assert_eq!(err.to_string(), "HTTP error: 404 Client Error");
    }

    #[test]
    fn test_non_http_accessors() {
        let err: NetworkError<String> = NetworkError::NoData;
        assert_eq!(err.status(), None);
        assert!(err.api_error().is_none());
    }

    #[test]
    fn test_retry_limit_message() {
        let err = AuthenticatorError::RetryLimitExceeded { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "Re-authentication limit reached after 3 attempts"
        );
    }
}
