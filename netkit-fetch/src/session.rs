//! The transport capability the network stack sends requests through.
//!
//! A [`Session`] runs one request per call on its own executor and reports
//! the outcome through a completion callback. The default implementation is
//! [`ReqwestSession`](crate::host::http::ReqwestSession); tests substitute
//! their own.

use std::sync::{Arc, Weak};

use crate::challenge::{Challenge, ChallengeCompletion};
use crate::request::{HttpRequest, SessionReply};

/// Completion callback of a session task.
pub type SessionCompletion = Box<dyn FnOnce(SessionReply) + Send>;

/// An in-flight transport task.
pub trait SessionTask: Send + Sync {
    /// Cancels the task. A cancelled task never runs its completion.
    fn cancel(&self);
}

/// Receives identity challenges raised by the transport.
pub trait SessionDelegate: Send + Sync {
    /// Answers a challenge by eventually calling `completion` exactly once.
    fn did_receive_challenge(&self, challenge: Challenge, completion: ChallengeCompletion);
}

/// A transport able to execute requests asynchronously.
pub trait Session: Send + Sync {
    /// Starts `request` and returns its task immediately.
    ///
    /// The session must keep the returned task alive until `completion` has
    /// run (callers only hold weak references to it) and must call
    /// `completion` at most once. Challenges are forwarded to `delegate` if
    /// it is still alive.
    fn execute(
        &self,
        request: HttpRequest,
        delegate: Weak<dyn SessionDelegate>,
        completion: SessionCompletion,
    ) -> Arc<dyn SessionTask>;
}
