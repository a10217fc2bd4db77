//! Transport-level identity challenges.
//!
//! When the transport needs credentials it cannot derive from the request
//! (e.g. a server answering `401` with `WWW-Authenticate: Basic`), it raises
//! a [`Challenge`] to its [`SessionDelegate`](crate::session::SessionDelegate).
//! The network stack hands the challenge to a configured [`ChallengeHandler`]
//! or falls back to [`default_disposition`].

use std::fmt;

use tracing::debug;

// ============================================================================
// Challenge
// ============================================================================

/// The authentication scheme a challenge asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    /// HTTP Basic.
    HttpBasic,
    /// HTTP Digest.
    HttpDigest,
    /// Server certificate trust evaluation.
    ServerTrust,
    /// Client certificate.
    ClientCertificate,
    /// Any other scheme, by name.
    Other(String),
}

impl AuthenticationMethod {
    /// Maps a `WWW-Authenticate` scheme name to a method.
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "basic" => Self::HttpBasic,
            "digest" => Self::HttpDigest,
            _ => Self::Other(scheme.to_string()),
        }
    }
}

/// A username/password credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl Credential {
    /// Creates a credential.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A request for credentials raised by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    /// Host that issued the challenge.
    pub host: String,
    /// Port, if known.
    pub port: Option<u16>,
    /// Requested scheme.
    pub method: AuthenticationMethod,
    /// Realm, if the server named one.
    pub realm: Option<String>,
    /// How many times this request was already challenged.
    pub previous_failure_count: u32,
    /// Credential the transport would use on its own (e.g. from the URL).
    pub proposed_credential: Option<Credential>,
}

// ============================================================================
// Disposition
// ============================================================================

/// How to answer a challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeDisposition {
    /// Retry the request with this credential.
    UseCredential(Credential),
    /// Let the transport decide, optionally with the credential it proposed.
    PerformDefaultHandling(Option<Credential>),
    /// Fail the request.
    CancelChallenge,
    /// Ignore this challenge and keep the original response.
    RejectProtectionSpace,
}

/// Callback receiving the disposition of a challenge.
pub type ChallengeCompletion = Box<dyn FnOnce(ChallengeDisposition) + Send>;

/// Answers identity challenges on behalf of the network stack.
pub trait ChallengeHandler: Send + Sync {
    /// Handles `challenge`, eventually calling `completion` exactly once.
    fn handle(&self, challenge: Challenge, completion: ChallengeCompletion);
}

/// Disposition used when no [`ChallengeHandler`] is configured.
pub fn default_disposition(challenge: &Challenge) -> ChallengeDisposition {
    debug!(
        host = %challenge.host,
        has_proposed = challenge.proposed_credential.is_some(),
        "Performing default challenge handling"
    );
    ChallengeDisposition::PerformDefaultHandling(challenge.proposed_credential.clone())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(proposed: Option<Credential>) -> Challenge {
        Challenge {
            host: "example.com".to_string(),
            port: Some(443),
            method: AuthenticationMethod::HttpBasic,
            realm: Some("api".to_string()),
            previous_failure_count: 0,
            proposed_credential: proposed,
        }
    }

    #[test]
    fn test_default_disposition_uses_proposed_credential() {
        let credential = Credential::new("u", "p");
        assert_eq!(
            default_disposition(&challenge(Some(credential.clone()))),
            ChallengeDisposition::PerformDefaultHandling(Some(credential))
        );
        assert_eq!(
            default_disposition(&challenge(None)),
            ChallengeDisposition::PerformDefaultHandling(None)
        );
    }

    #[test]
    fn test_method_from_scheme() {
        assert_eq!(AuthenticationMethod::from_scheme("Basic"), AuthenticationMethod::HttpBasic);
        assert_eq!(
            AuthenticationMethod::from_scheme("Negotiate"),
            AuthenticationMethod::Other("Negotiate".to_string())
        );
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let debug = format!("{:?}", Credential::new("alice", "secret"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }
}
