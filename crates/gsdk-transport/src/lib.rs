//! Transport abstraction layer for the game server SDK.
//!
//! The heartbeat engine talks to the agent through the [`Transport`] trait:
//! one PATCH with a body out, one status and body back. Keeping that seam
//! as a trait lets the engine run against a scripted in-memory transport
//! in tests, and against [`HttpTransport`] in production.
//!
//! # Feature Flags
//!
//! - `http` (default): HTTP transport via `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{DEFAULT_REQUEST_TIMEOUT, HttpTransport};

/// What came back from the agent.
///
/// Any status counts as a response here; deciding what a 404 or 500 means
/// is the engine's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// The `Content-Length` the agent declared, if any.
    pub content_length: Option<u64>,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status,
            content_length: Some(body.len() as u64),
            body,
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text, with invalid UTF-8 replaced. For log lines.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one heartbeat body to the agent and returns its reply.
///
/// Implementations must be safe to share with the heartbeat thread. The
/// returned future is driven on that thread's own runtime, so it does not
/// need to be `Send`.
///
/// Cancellation is by drop: the engine abandons an in-flight `patch` when
/// it shuts down, so implementations must not rely on running to
/// completion.
pub trait Transport: Send + Sync + 'static {
    /// PATCHes `body` to `url`.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no HTTP response was obtained.
    async fn patch(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError>;
}
