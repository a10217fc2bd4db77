//! Host transports for the network stack.
//!
//! - [`http`] - `reqwest`-backed session with domain allowlist and Basic
//!   challenge support

pub mod http;

// Re-export key types
pub use http::ReqwestSession;
