//! Error types for the protocol layer.
//!
//! Each crate in the SDK defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization or in the shape
//! of a document, not in networking or configuration.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outgoing heartbeat failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The incoming body is not valid JSON.
    ///
    /// Common causes: truncated body, an HTML error page from a proxy, or
    /// an empty response.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body is valid JSON but not a heartbeat response at all
    /// (e.g., a top-level array or a bare string).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
