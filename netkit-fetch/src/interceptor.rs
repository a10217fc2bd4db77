//! Request interceptors.
//!
//! Interceptors observe every attempt of a fetch: [`Interceptor::before_send`]
//! runs right before the request is handed to the session and
//! [`Interceptor::after_response`] runs when the session reports back. They
//! run in registration order and cannot change the outcome of the fetch.

use tracing::{debug, warn};

use crate::error::TransportError;
use crate::request::{HttpRequest, Response};

/// Side-effect-only hooks around each request attempt.
pub trait Interceptor: Send + Sync {
    /// Called before the request is sent.
    fn before_send(&self, request: &HttpRequest) {
        let _ = request;
    }

    /// Called when the transport finished, successfully or not.
    fn after_response(
        &self,
        response: Option<&Response>,
        body: Option<&[u8]>,
        error: Option<&TransportError>,
        request: &HttpRequest,
    ) {
        let _ = (response, body, error, request);
    }
}

// ============================================================================
// Tracing Interceptor
// ============================================================================

/// Logs every request and response with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn before_send(&self, request: &HttpRequest) {
        debug!(
            method = %request.method,
            url = %request.url,
            has_body = request.body.is_some(),
            "Sending request"
        );
    }

    fn after_response(
        &self,
        response: Option<&Response>,
        body: Option<&[u8]>,
        error: Option<&TransportError>,
        request: &HttpRequest,
    ) {
        let body_len = body.map_or(0, <[u8]>::len);

        if let Some(error) = error {
            warn!(url = %request.url, error = %error, "Request failed");
            return;
        }

        match response {
            Some(Response::Http(http)) => debug!(
                url = %request.url,
                status = http.status,
                body_len,
                "Response received"
            ),
            Some(Response::NonHttp { .. }) => debug!(url = %request.url, "Non-HTTP response received"),
            None => debug!(url = %request.url, "No response received"),
        }
    }
}
