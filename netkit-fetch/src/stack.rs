//! The network stack: authenticated fetch pipeline.
//!
//! A fetch goes through these steps:
//!
//! 1. authenticate the resource's request (if an authenticator is configured),
//! 2. run the interceptors' `before_send` hooks and hand the request to the
//!    session,
//! 3. when the session reports back, run the `after_response` hooks and
//!    classify the outcome,
//! 4. if the authenticator says the credential was rejected, go back to 1
//!    (bounded by [`StackSettings::max_reauthentications`]),
//! 5. otherwise invoke the completion with the typed result.
//!
//! Every step registers its cancelable in one [`CancelableBag`], which is
//! what [`NetworkStack::fetch`] returns. Callbacks only hold a weak reference
//! to the stack; once the stack is dropped, in-flight fetches end silently.

use std::sync::{Arc, Weak};

use futures::future::{AbortHandle, Abortable};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::authenticator::Authenticator;
use crate::cancel::{Cancelable, CancelableBag, TaskCancelable};
use crate::challenge::{Challenge, ChallengeCompletion, ChallengeHandler, default_disposition};
use crate::config::StackSettings;
use crate::error::{AuthenticatorError, ConfigError, NetworkError, TransportError};
use crate::host::http::ReqwestSession;
use crate::interceptor::Interceptor;
use crate::request::{HttpRequest, HttpResponse, Response, SessionReply};
use crate::resource::{Payload, Resource};
use crate::session::{Session, SessionDelegate};
use crate::status::HttpStatus;

/// Result delivered to the completion of a fetch.
pub type FetchResult<R> =
    Result<<R as Resource>::Local, NetworkError<<R as Resource>::ApiError>>;

type Completion<R> = Box<dyn FnOnce(FetchResult<R>) + Send>;

// ============================================================================
// Fetch State
// ============================================================================

/// Everything one fetch carries from attempt to attempt.
struct FetchState<R: Resource> {
    resource: R,
    bag: Arc<CancelableBag>,
    completion: Completion<R>,
    reauthentications: u32,
}

impl<R: Resource> FetchState<R> {
    fn complete(self, result: FetchResult<R>) {
        (self.completion)(result);
    }
}

// ============================================================================
// Network Stack
// ============================================================================

/// Executes [`Resource`] fetches through a [`Session`].
///
/// ```ignore
/// let stack = NetworkStack::builder()
///     .authenticator(Arc::new(BearerAuthenticator::new(tokens)))
///     .interceptor(Arc::new(TracingInterceptor))
///     .build()?;
///
/// let handle = stack.fetch(Profile { id: 7 }, |result| match result {
///     Ok(user) => println!("{user:?}"),
///     Err(e) => eprintln!("{e}"),
/// });
///
/// // Later, if the result is no longer needed:
/// handle.cancel();
/// ```
pub struct NetworkStack {
    inner: Arc<StackInner>,
}

struct StackInner {
    session: Arc<dyn Session>,
    authenticator: Option<Arc<dyn Authenticator>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    challenge_handler: Option<Arc<dyn ChallengeHandler>>,
    settings: StackSettings,
}

impl NetworkStack {
    /// Creates a builder for configuring a stack.
    pub fn builder() -> NetworkStackBuilder {
        NetworkStackBuilder::new()
    }

    /// Returns the stack settings.
    pub fn settings(&self) -> &StackSettings {
        &self.inner.settings
    }

    /// Returns true if an authenticator is configured.
    pub fn has_authenticator(&self) -> bool {
        self.inner.authenticator.is_some()
    }

    /// Returns the number of registered interceptors.
    pub fn interceptor_count(&self) -> usize {
        self.inner.interceptors.len()
    }

    /// Fetches `resource` and calls `completion` with the result.
    ///
    /// Returns immediately. The completion runs at most once, on the
    /// session's executor; it does not run if the returned handle is
    /// cancelled first or the stack is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime while an authenticator is
    /// configured, since authentication runs on a spawned task. The default
    /// [`ReqwestSession`] has the same requirement for every request.
    #[instrument(skip_all)]
    pub fn fetch<R, F>(&self, resource: R, completion: F) -> Arc<CancelableBag>
    where
        R: Resource,
        F: FnOnce(FetchResult<R>) + Send + 'static,
    {
        let bag = Arc::new(CancelableBag::new());
        let request = resource.request();
        debug!(method = %request.method, url = %request.url, "Starting fetch");

        let state = FetchState {
            resource,
            bag: Arc::clone(&bag),
            completion: Box::new(completion),
            reauthentications: 0,
        };
        self.inner.authenticate(request, state);

        bag
    }

    /// Fetches `resource` and waits for the result.
    ///
    /// Dropping the returned future cancels the fetch. If the fetch ends
    /// without a result, because the session dropped the request or the
    /// authentication step was aborted, the result is
    /// [`TransportError::Cancelled`].
    ///
    /// # Panics
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn fetch_async<R: Resource>(&self, resource: R) -> FetchResult<R> {
        let (tx, rx) = oneshot::channel();
        let bag = self.fetch(resource, move |result| {
            let _ = tx.send(result);
        });
        let _guard = CancelOnDrop(bag);

        rx.await
            .unwrap_or(Err(NetworkError::Transport(TransportError::Cancelled)))
    }
}

impl SessionDelegate for NetworkStack {
    fn did_receive_challenge(&self, challenge: Challenge, completion: ChallengeCompletion) {
        self.inner.did_receive_challenge(challenge, completion);
    }
}

impl std::fmt::Debug for NetworkStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkStack")
            .field("settings", &self.inner.settings)
            .field("authenticator", &self.inner.authenticator.is_some())
            .field("interceptors", &self.inner.interceptors.len())
            .field("challenge_handler", &self.inner.challenge_handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Cancels a fetch when `fetch_async` is dropped.
struct CancelOnDrop(Arc<CancelableBag>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

// ============================================================================
// Pipeline
// ============================================================================

impl StackInner {
    /// Authenticates `request`, then dispatches it.
    fn authenticate<R: Resource>(self: &Arc<Self>, request: HttpRequest, state: FetchState<R>) {
        let Some(authenticator) = self.authenticator.clone() else {
            self.dispatch(request, state);
            return;
        };

        if state.bag.is_cancelled() {
            debug!("Fetch cancelled, skipping authentication");
            return;
        }

        let (handle, registration) = AbortHandle::new_pair();
        state.bag.add(Box::new(handle));

        let stack = Arc::downgrade(self);
        tokio::spawn(async move {
            let authenticated =
                Abortable::new(authenticator.authenticate(request), registration).await;
            let Ok(authenticated) = authenticated else {
                debug!("Authentication cancelled");
                return;
            };
            let Some(stack) = stack.upgrade() else {
                debug!("Network stack released, dropping authentication result");
                return;
            };

            match authenticated {
                Ok(request) => stack.dispatch(request, state),
                Err(error) => {
                    warn!(error = %error, "Authentication failed");
                    state.complete(Err(NetworkError::Authenticator(
                        AuthenticatorError::Rejected(error),
                    )));
                }
            }
        });
    }

    /// Runs the send hooks and hands the request to the session.
    fn dispatch<R: Resource>(self: &Arc<Self>, request: HttpRequest, state: FetchState<R>) {
        if state.bag.is_cancelled() {
            debug!("Fetch cancelled, skipping dispatch");
            return;
        }

        for interceptor in &self.interceptors {
            interceptor.before_send(&request);
        }

        debug!(
            url = %request.url,
            attempt = state.reauthentications + 1,
            "Dispatching request"
        );

        let bag = Arc::clone(&state.bag);
        let stack: Weak<StackInner> = Arc::downgrade(self);
        let delegate: Weak<dyn SessionDelegate> = stack.clone();
        let sent = request.clone();

        let task = self.session.execute(
            request,
            delegate,
            Box::new(move |reply| match stack.upgrade() {
                Some(stack) => stack.handle_reply(&sent, reply, state),
                None => debug!("Network stack released, dropping response"),
            }),
        );

        bag.add(Box::new(TaskCancelable::new(Arc::downgrade(&task))));
    }

    /// Runs the response hooks and decides between retry and completion.
    fn handle_reply<R: Resource>(
        self: &Arc<Self>,
        request: &HttpRequest,
        reply: SessionReply,
        state: FetchState<R>,
    ) {
        let SessionReply {
            response,
            body,
            error,
        } = reply;

        for interceptor in &self.interceptors {
            interceptor.after_response(response.as_ref(), body.as_deref(), error.as_ref(), request);
        }

        if let Some(error) = error {
            warn!(url = %request.url, error = %error, "Transport error");
            state.complete(Err(NetworkError::Transport(error)));
            return;
        }

        let Some(Response::Http(response)) = response else {
            warn!(url = %request.url, "Response is not an HTTP response");
            state.complete(Err(NetworkError::BadResponse));
            return;
        };

        if let Some(authenticator) = &self.authenticator {
            if authenticator.is_authentication_invalid(request, body.as_deref(), &response, None) {
                self.reauthenticate(request, state);
                return;
            }
        }

        let result = classify(&state.resource, &response, body);
        info!(
            url = %request.url,
            status = response.status,
            success = result.is_ok(),
            "Fetch completed"
        );
        state.complete(result);
    }

    /// Starts another authenticated attempt, unless the limit was reached.
    fn reauthenticate<R: Resource>(self: &Arc<Self>, rejected: &HttpRequest, mut state: FetchState<R>) {
        if state.reauthentications >= self.settings.max_reauthentications {
            warn!(
                url = %rejected.url,
                attempts = state.reauthentications,
                "Re-authentication limit reached"
            );
            let attempts = state.reauthentications;
            state.complete(Err(NetworkError::Authenticator(
                AuthenticatorError::RetryLimitExceeded { attempts },
            )));
            return;
        }

        state.reauthentications += 1;
        info!(
            url = %rejected.url,
            attempt = state.reauthentications,
            "Credential rejected, re-authenticating"
        );

        let request = state.resource.request();
        self.authenticate(request, state);
    }
}

impl SessionDelegate for StackInner {
    fn did_receive_challenge(&self, challenge: Challenge, completion: ChallengeCompletion) {
        match &self.challenge_handler {
            Some(handler) => {
                debug!(host = %challenge.host, "Delegating challenge to handler");
                handler.handle(challenge, completion);
            }
            None => completion(default_disposition(&challenge)),
        }
    }
}

/// Maps a well-formed HTTP exchange to the fetch result.
fn classify<R: Resource>(resource: &R, response: &HttpResponse, body: Option<Vec<u8>>) -> FetchResult<R> {
    let status = response.http_status();

    if status.is_no_content() {
        if let Some(empty) = resource.no_content() {
            return Ok(empty);
        }
    }

    let remote = body.and_then(R::Remote::from_body);
    match (status, remote) {
        (HttpStatus::Success(_), Some(remote)) => Ok(resource.into_local(remote)),
        (HttpStatus::Success(_), None) => Err(NetworkError::NoData),
        (status, Some(remote)) => Err(NetworkError::Http {
            status,
            api_error: resource.api_error(&remote),
        }),
        (status, None) => Err(NetworkError::Http {
            status,
            api_error: None,
        }),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for constructing a [`NetworkStack`].
///
/// The session and the delegate wiring are fixed at `build` time; without
/// an explicit session a [`ReqwestSession`] is created from the settings.
#[derive(Default)]
pub struct NetworkStackBuilder {
    session: Option<Arc<dyn Session>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    challenge_handler: Option<Arc<dyn ChallengeHandler>>,
    settings: StackSettings,
}

impl NetworkStackBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session requests are executed with.
    pub fn session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the authenticator.
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Appends an interceptor. Interceptors run in the order they were added.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Sets the identity challenge handler.
    pub fn challenge_handler(mut self, handler: Arc<dyn ChallengeHandler>) -> Self {
        self.challenge_handler = Some(handler);
        self
    }

    /// Sets the stack settings.
    pub fn settings(mut self, settings: StackSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the network stack.
    pub fn build(self) -> Result<NetworkStack, ConfigError> {
        self.settings.validate()?;

        let session = match self.session {
            Some(session) => session,
            None => Arc::new(ReqwestSession::with_settings(&self.settings)?),
        };

        Ok(NetworkStack {
            inner: Arc::new(StackInner {
                session,
                authenticator: self.authenticator,
                interceptors: self.interceptors,
                challenge_handler: self.challenge_handler,
                settings: self.settings,
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
