//! `reqwest`-backed session.
//!
//! [`ReqwestSession`] is the production [`Session`]: every request runs on a
//! spawned Tokio task that can be aborted through the returned
//! [`SessionTask`]. On top of plain request execution it adds
//! - a domain allowlist, enforced on redirects too,
//! - HTTP Basic challenges raised to the session delegate.

use std::sync::{Arc, LazyLock, Weak};

use futures::future::{AbortHandle, Abortable};
use regex::Regex;
use reqwest::{Client, header, redirect};
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::challenge::{
    AuthenticationMethod, Challenge, ChallengeDisposition, Credential, default_disposition,
};
use crate::config::StackSettings;
use crate::error::{ConfigError, TransportError};
use crate::request::{HttpRequest, HttpResponse, SessionReply};
use crate::session::{Session, SessionCompletion, SessionDelegate, SessionTask};
use crate::status::HttpStatus;

/// Realm parameter of a `WWW-Authenticate` header.
static REALM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)realm\s*=\s*"([^"]*)""#).expect("Invalid regex")
});

// ============================================================================
// Task
// ============================================================================

/// Handle to a request running on the Tokio runtime.
#[derive(Debug)]
struct ReqwestTask {
    handle: AbortHandle,
}

impl SessionTask for ReqwestTask {
    fn cancel(&self) {
        debug!("Aborting request task");
        self.handle.abort();
    }
}

// ============================================================================
// Domain Allowlist
// ============================================================================

/// Redirect hops followed before giving up, as reqwest's default policy does.
const MAX_REDIRECTS: usize = 10;

/// Raised by the redirect policy when a hop leaves the allowlist.
#[derive(Debug, thiserror::Error)]
#[error("Domain not allowed: {0}")]
struct DomainNotAllowed(String);

fn check_domain(allowed: Option<&[String]>, url: &Url) -> Result<(), DomainNotAllowed> {
    let Some(allowed) = allowed else {
        return Ok(()); // No restrictions
    };

    let host = url.host_str().unwrap_or_default();
    let allowed = allowed
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

    if allowed {
        Ok(())
    } else {
        Err(DomainNotAllowed(host.to_string()))
    }
}

/// Follows redirects only to allowed hosts.
fn redirect_policy(allowed: Option<Arc<Vec<String>>>) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match check_domain(allowed.as_deref().map(Vec::as_slice), attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(e) => {
                warn!(url = %attempt.url(), "Refusing redirect outside the allowlist");
                attempt.error(e)
            }
        }
    })
}

// ============================================================================
// Reqwest Session
// ============================================================================

/// Session executing requests with a shared `reqwest::Client`.
///
/// # Panics
///
/// [`Session::execute`] spawns the request on the current Tokio runtime and
/// panics when called outside one.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    inner: Client,
    settings: StackSettings,
    allowed_domains: Option<Arc<Vec<String>>>,
}

impl ReqwestSession {
    /// Creates a session with default settings.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_settings(&StackSettings::default())
    }

    /// Creates a session from stack settings.
    pub fn with_settings(settings: &StackSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: build_client(settings, None)?,
            settings: settings.clone(),
            allowed_domains: None,
        })
    }

    /// Restricts requests to the given domains and their subdomains.
    ///
    /// The allowlist also applies to every redirect hop; a redirect leaving
    /// it fails the request before the new host is contacted.
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Result<Self, ConfigError> {
        let allowed = Arc::new(domains);
        self.inner = build_client(&self.settings, Some(Arc::clone(&allowed)))?;
        self.allowed_domains = Some(allowed);
        Ok(self)
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &Url) -> Result<(), TransportError> {
        check_domain(self.allowed_domains.as_deref().map(Vec::as_slice), url)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }

    /// Runs a request to completion, answering challenges along the way.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn perform(
        &self,
        mut request: HttpRequest,
        delegate: Weak<dyn SessionDelegate>,
    ) -> SessionReply {
        if let Err(e) = self.is_domain_allowed(&request.url) {
            return SessionReply::failed(e);
        }

        let mut failures = 0;
        loop {
            let (response, body) = match self.send(&request).await {
                Ok(reply) => reply,
                Err(e) => return SessionReply::failed(e),
            };

            let challenge = (failures < self.settings.max_challenge_rounds)
                .then(|| basic_challenge(&request, &response, failures))
                .flatten();

            if let Some(challenge) = challenge {
                let host = challenge.host.clone();
                match ask_delegate(&delegate, challenge).await {
                    ChallengeDisposition::UseCredential(credential)
                    | ChallengeDisposition::PerformDefaultHandling(Some(credential)) => {
                        debug!(host = %host, "Retrying with challenge credential");
                        request = match request.with_basic_auth(&credential.user, &credential.password) {
                            Ok(request) => request,
                            Err(e) => return SessionReply::failed(e),
                        };
                        failures += 1;
                        continue;
                    }
                    ChallengeDisposition::CancelChallenge => {
                        return SessionReply::failed(TransportError::ChallengeCancelled(host));
                    }
                    ChallengeDisposition::PerformDefaultHandling(None)
                    | ChallengeDisposition::RejectProtectionSpace => {}
                }
            }

            return SessionReply::http(response, Some(body));
        }
    }

    async fn send(&self, request: &HttpRequest) -> Result<(HttpResponse, Vec<u8>), TransportError> {
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let head = HttpResponse {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        };
        debug!(status = head.status, "Response received");

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok((head, body.to_vec()))
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if let Some(refused) = refused_redirect(&error) {
            TransportError::InvalidRequest(refused.to_string())
        } else if error.is_timeout() {
            TransportError::Timeout(self.settings.timeout())
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Request(error)
        }
    }
}

impl Session for ReqwestSession {
    fn execute(
        &self,
        request: HttpRequest,
        delegate: Weak<dyn SessionDelegate>,
        completion: SessionCompletion,
    ) -> Arc<dyn SessionTask> {
        let (handle, registration) = AbortHandle::new_pair();
        let task: Arc<dyn SessionTask> = Arc::new(ReqwestTask { handle });

        let session = self.clone();
        let keep_alive = Arc::clone(&task);
        tokio::spawn(async move {
            // The task stays alive until the completion has run.
            let _task = keep_alive;
            match Abortable::new(session.perform(request, delegate), registration).await {
                Ok(reply) => completion(reply),
                Err(_) => debug!("Request cancelled before completion"),
            }
        });

        task
    }
}

/// Finds the allowlist error behind a failed redirect.
fn refused_redirect(error: &reqwest::Error) -> Option<&DomainNotAllowed> {
    if !error.is_redirect() {
        return None;
    }

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(refused) = cause.downcast_ref::<DomainNotAllowed>() {
            return Some(refused);
        }
        source = cause.source();
    }
    None
}

fn build_client(
    settings: &StackSettings,
    allowed: Option<Arc<Vec<String>>>,
) -> Result<Client, ConfigError> {
    Ok(Client::builder()
        .timeout(settings.timeout())
        .connect_timeout(settings.connect_timeout())
        .user_agent(settings.user_agent.as_str())
        .redirect(redirect_policy(allowed))
        .build()?)
}

// ============================================================================
// Challenges
// ============================================================================

/// Builds a challenge from a `401` carrying `WWW-Authenticate: Basic`.
fn basic_challenge(
    request: &HttpRequest,
    response: &HttpResponse,
    previous_failure_count: u32,
) -> Option<Challenge> {
    if response.status != HttpStatus::UNAUTHORIZED {
        return None;
    }

    let value = response
        .headers
        .get(header::WWW_AUTHENTICATE)?
        .to_str()
        .ok()?;
    let scheme = value.split_whitespace().next()?;
    let method = AuthenticationMethod::from_scheme(scheme);
    if method != AuthenticationMethod::HttpBasic {
        return None;
    }

    let realm = REALM_RE
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let url = &request.url;
    let proposed_credential = (!url.username().is_empty())
        .then(|| Credential::new(url.username(), url.password().unwrap_or_default()));

    Some(Challenge {
        host: url.host_str().unwrap_or_default().to_string(),
        port: url.port_or_known_default(),
        method,
        realm,
        previous_failure_count,
        proposed_credential,
    })
}

/// Hands a challenge to the delegate and waits for its disposition.
async fn ask_delegate(
    delegate: &Weak<dyn SessionDelegate>,
    challenge: Challenge,
) -> ChallengeDisposition {
    let Some(delegate) = delegate.upgrade() else {
        return default_disposition(&challenge);
    };

    let (tx, rx) = oneshot::channel();
    delegate.did_receive_challenge(
        challenge,
        Box::new(move |disposition| {
            let _ = tx.send(disposition);
        }),
    );
    drop(delegate);

    rx.await.unwrap_or_else(|_| {
        warn!("Challenge handler dropped its completion, keeping original response");
        ChallengeDisposition::RejectProtectionSpace
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unauthorized(www_authenticate: &str) -> HttpResponse {
        let mut response = HttpResponse::new(401, Url::parse("https://api.example.com").unwrap());
        response.headers.insert(
            header::WWW_AUTHENTICATE,
            header::HeaderValue::from_str(www_authenticate).unwrap(),
        );
        response
    }

    #[test]
    fn test_domain_allowlist() {
        let session = ReqwestSession::new()
            .unwrap()
            .with_allowed_domains(vec!["example.com".to_string()])
            .unwrap();

        let allowed = Url::parse("https://api.example.com/v1").unwrap();
        let denied = Url::parse("https://evil.com/steal").unwrap();
        assert!(session.is_domain_allowed(&allowed).is_ok());
        assert!(session.is_domain_allowed(&denied).is_err());
    }

    #[test]
    fn test_no_domain_restrictions() {
        let session = ReqwestSession::new().unwrap();
        let url = Url::parse("https://any.domain.com").unwrap();
        assert!(session.is_domain_allowed(&url).is_ok());
    }

    #[test]
    fn test_basic_challenge_parsing() {
        let request = HttpRequest::parse_get("https://bob:pw@api.example.com/me").unwrap();
        let challenge = basic_challenge(&request, &unauthorized(r#"Basic realm="api""#), 0).unwrap();

        assert_eq!(challenge.method, AuthenticationMethod::HttpBasic);
        assert_eq!(challenge.realm.as_deref(), Some("api"));
        assert_eq!(challenge.port, Some(443));
        assert_eq!(challenge.proposed_credential, Some(Credential::new("bob", "pw")));
    }

    #[test]
    fn test_bearer_challenge_is_ignored() {
        let request = HttpRequest::parse_get("https://api.example.com/me").unwrap();
        assert!(basic_challenge(&request, &unauthorized("Bearer"), 0).is_none());
    }
}
