// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `NetKit` Fetch
//!
//! Authenticated, cancelable fetching of typed resources over HTTP.
//!
//! ## Network Stack
//!
//! - [`resource::Resource`] - Describes a request and how to decode its result
//! - [`stack::NetworkStack`] - Runs the authenticate, send, classify pipeline
//! - [`cancel::CancelableBag`] - Handle that cancels every step of a fetch
//! - [`authenticator::Authenticator`] - Signs requests, detects stale credentials
//! - [`interceptor::Interceptor`] - Observes requests and responses
//! - [`challenge::ChallengeHandler`] - Answers identity challenges
//!
//! ## Host Transport
//!
//! - [`session::Session`] - Transport abstraction the stack executes on
//! - [`host::http`] - `reqwest`-backed session with domain allowlist
//!
//! ## Example
//!
//! ```ignore
//! use netkit_fetch::{NetworkStack, TracingInterceptor};
//!
//! let stack = NetworkStack::builder()
//!     .interceptor(Arc::new(TracingInterceptor))
//!     .build()?;
//!
//! let handle = stack.fetch(UserResource { id: 7 }, |result| {
//!     println!("{result:?}");
//! });
//!
//! // Or await the result directly
//! let user = stack.fetch_async(UserResource { id: 7 }).await?;
//! ```

// Core modules
pub mod authenticator;
pub mod cancel;
pub mod challenge;
pub mod config;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod request;
pub mod resource;
pub mod session;
pub mod stack;
pub mod status;

// Re-export key types at crate root

// Errors
pub use error::{AuthenticatorError, BoxError, ConfigError, NetworkError, TransportError};

// Stack
pub use config::StackSettings;
pub use stack::{FetchResult, NetworkStack, NetworkStackBuilder};

// Resources & transport
pub use request::{HttpRequest, HttpResponse, Response, SessionReply};
pub use resource::{Payload, Resource};
pub use session::{Session, SessionCompletion, SessionDelegate, SessionTask};
pub use status::{HttpStatus, StatusClass};

// Collaborators
pub use authenticator::{Authenticator, BearerAuthenticator, TokenProvider};
pub use cancel::{Cancelable, CancelableBag, NoopCancelable, TaskCancelable};
pub use challenge::{
    AuthenticationMethod, Challenge, ChallengeCompletion, ChallengeDisposition, ChallengeHandler,
    Credential, default_disposition,
};
pub use host::ReqwestSession;
pub use interceptor::{Interceptor, TracingInterceptor};
