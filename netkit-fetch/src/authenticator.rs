//! Request authentication.
//!
//! An [`Authenticator`] signs requests before they are sent and recognizes
//! responses that mean the credential was rejected. The network stack then
//! asks it to authenticate again and retries the request.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{BoxError, TransportError};
use crate::request::{HttpRequest, HttpResponse};
use crate::status::HttpStatus;

// ============================================================================
// Authenticator Trait
// ============================================================================

/// Authenticates requests and detects stale credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns `request` with credentials applied.
    ///
    /// Called before the first attempt and again after
    /// [`is_authentication_invalid`](Self::is_authentication_invalid)
    /// returned true. The network stack may abort the returned future when
    /// the fetch is cancelled.
    async fn authenticate(&self, request: HttpRequest) -> Result<HttpRequest, BoxError>;

    /// Returns true if the exchange shows the credential was invalid or expired.
    fn is_authentication_invalid(
        &self,
        request: &HttpRequest,
        body: Option<&[u8]>,
        response: &HttpResponse,
        error: Option<&TransportError>,
    ) -> bool;
}

// ============================================================================
// Bearer Token Authenticator
// ============================================================================

/// Source of bearer tokens.
///
/// Storage of the tokens is up to the implementation.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current token.
    async fn token(&self) -> Result<String, BoxError>;

    /// Returns a fresh token after the server rejected `rejected`.
    async fn refresh(&self, rejected: &str) -> Result<String, BoxError>;
}

/// Authenticates with `Authorization: Bearer` and treats `401` as a stale token.
///
/// The last rejected token is remembered. `authenticate` refreshes only while
/// the provider still hands out that token, so concurrent fetches that were
/// rejected with the same token trigger at most one refresh between them and
/// never resend a token known to be stale.
pub struct BearerAuthenticator<P> {
    provider: P,
    rejected: Mutex<Option<String>>,
}

impl<P: TokenProvider> BearerAuthenticator<P> {
    /// Creates an authenticator over a token provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            rejected: Mutex::new(None),
        }
    }

    /// Returns the token provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn is_rejected(&self, token: &str) -> bool {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(token)
    }
}

#[async_trait]
impl<P: TokenProvider> Authenticator for BearerAuthenticator<P> {
    async fn authenticate(&self, request: HttpRequest) -> Result<HttpRequest, BoxError> {
        let mut token = self.provider.token().await?;
        if self.is_rejected(&token) {
            info!(url = %request.url, "Refreshing rejected bearer token");
            token = self.provider.refresh(&token).await?;
        }

        Ok(request.with_bearer_token(&token)?)
    }

    fn is_authentication_invalid(
        &self,
        request: &HttpRequest,
        _body: Option<&[u8]>,
        response: &HttpResponse,
        _error: Option<&TransportError>,
    ) -> bool {
        if response.status != HttpStatus::UNAUTHORIZED {
            return false;
        }

        debug!(url = %request.url, "Bearer token rejected");
        let token = request
            .authorization()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);
        if token.is_some() {
            *self.rejected.lock().unwrap_or_else(PoisonError::into_inner) = token;
        }
        true
    }
}

impl<P> std::fmt::Debug for BearerAuthenticator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthenticator").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
