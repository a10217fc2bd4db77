//! HTTP status code classification.
//!
//! Every status code falls into exactly one [`HttpStatus`] class, so the
//! fetch pipeline can branch on a class (`HttpStatus::Success(_)`) or on an
//! exact code (`HttpStatus::Success(204)`) with ordinary pattern matching.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Status Class
// ============================================================================

/// The class of an HTTP status code, without the code itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

impl StatusClass {
    /// Returns the display name for this class.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Informational => "Informational",
            Self::Success => "Success",
            Self::Redirection => "Redirection",
            Self::ClientError => "Client Error",
            Self::ServerError => "Server Error",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// HTTP Status
// ============================================================================

/// A classified HTTP status code.
///
/// Codes below 200 are informational and codes of 500 and above are server
/// errors, so out-of-range values still land in exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpStatus {
    /// 1xx
    Informational(u16),
    /// 2xx
    Success(u16),
    /// 3xx
    Redirection(u16),
    /// 4xx
    ClientError(u16),
    /// 5xx
    ServerError(u16),
}

impl HttpStatus {
    /// `204 No Content`
    pub const NO_CONTENT: u16 = 204;
    /// `401 Unauthorized`
    pub const UNAUTHORIZED: u16 = 401;

    /// Returns the raw status code.
    pub fn code(&self) -> u16 {
        match *self {
            Self::Informational(code)
            | Self::Success(code)
            | Self::Redirection(code)
            | Self::ClientError(code)
            | Self::ServerError(code) => code,
        }
    }

    /// Returns the class of this status.
    pub fn class(&self) -> StatusClass {
        match self {
            Self::Informational(_) => StatusClass::Informational,
            Self::Success(_) => StatusClass::Success,
            Self::Redirection(_) => StatusClass::Redirection,
            Self::ClientError(_) => StatusClass::ClientError,
            Self::ServerError(_) => StatusClass::ServerError,
        }
    }

    /// Returns true for 2xx codes.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if this is `204 No Content`.
    pub fn is_no_content(&self) -> bool {
        *self == Self::Success(Self::NO_CONTENT)
    }
}

impl From<u16> for HttpStatus {
    fn from(code: u16) -> Self {
        match code {
            0..=199 => Self::Informational(code),
            200..=299 => Self::Success(code),
            300..=399 => Self::Redirection(code),
            400..=499 => Self::ClientError(code),
            _ => Self::ServerError(code),
        }
    }
}

impl From<reqwest::StatusCode> for HttpStatus {
    fn from(status: reqwest::StatusCode) -> Self {
        Self::from(status.as_u16())
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.class())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(HttpStatus::from(100), HttpStatus::Informational(100));
        assert_eq!(HttpStatus::from(200), HttpStatus::Success(200));
        assert_eq!(HttpStatus::from(299), HttpStatus::Success(299));
        assert_eq!(HttpStatus::from(304), HttpStatus::Redirection(304));
        assert_eq!(HttpStatus::from(404), HttpStatus::ClientError(404));
        assert_eq!(HttpStatus::from(503), HttpStatus::ServerError(503));
    }

    #[test]
    fn test_out_of_range_codes() {
        assert_eq!(HttpStatus::from(42).class(), StatusClass::Informational);
        assert_eq!(HttpStatus::from(999).class(), StatusClass::ServerError);
    }

    #[test]
    fn test_matching_class_and_exact_code() {
        let status = HttpStatus::from(204);
        assert!(matches!(status, HttpStatus::Success(_)));
        assert!(matches!(status, HttpStatus::Success(HttpStatus::NO_CONTENT)));
        assert!(!matches!(HttpStatus::from(200), HttpStatus::Success(204)));
        assert!(status.is_no_content());
    }

    #[test]
    fn test_display() {
        assert_eq!(HttpStatus::from(500).to_string(), "500 Server Error");
        assert_eq!(StatusClass::ClientError.to_string(), "Client Error");
    }

    #[test]
    fn test_reqwest_conversion() {
        let status = HttpStatus::from(reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(status, HttpStatus::ClientError(HttpStatus::UNAUTHORIZED));
        assert_eq!(u16::from(status), 401);
    }
}
