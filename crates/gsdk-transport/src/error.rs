/// Errors that can occur in the transport layer.
///
/// A transport error never carries a decoded body: anything the agent
/// managed to send back, even with a failing status, is an `Ok` response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(String),

    /// The request could not be sent or the connection dropped mid-exchange.
    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// No complete response arrived within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The response started but its body could not be read.
    #[error("reading response body failed: {0}")]
    InvalidResponse(String),
}
