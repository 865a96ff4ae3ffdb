//! Codec trait and the JSON implementation used on the agent wire.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The engine doesn't care HOW heartbeats are serialized; it holds
//! something that implements [`Codec`]. The agent only speaks JSON today,
//! so [`JsonCodec`] is the one implementation.

use crate::{HeartbeatRequest, HeartbeatResponse, ProtocolError};

/// Encodes outgoing heartbeats and decodes the agent's replies.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec is shared between the application threads
///   and the heartbeat thread.
/// - `'static` → it doesn't borrow temporary data.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a heartbeat request into a request body.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode_request(
        &self,
        request: &HeartbeatRequest,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a response body.
    ///
    /// Only a structurally invalid document is an error. Individual fields
    /// with unexpected shapes are skipped and reported in
    /// [`HeartbeatResponse::skipped`].
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` for malformed JSON and
    /// `ProtocolError::InvalidMessage` when the top level is not an object.
    fn decode_response(
        &self,
        body: &[u8],
    ) -> Result<HeartbeatResponse, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use gsdk_protocol::{Codec, GameState, GameHealth, HeartbeatRequest, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let request = HeartbeatRequest {
///     current_game_state: GameState::StandingBy,
///     current_game_health: GameHealth::Healthy,
///     current_players: vec![],
/// };
///
/// let bytes = codec.encode_request(&request).unwrap();
/// let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
/// assert_eq!(json["CurrentGameState"], "StandingBy");
///
/// let response = codec.decode_response(br#"{"operation":"Continue"}"#).unwrap();
/// assert!(response.operation.is_some());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_request(
        &self,
        request: &HeartbeatRequest,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(request).map_err(ProtocolError::Encode)
    }

    fn decode_response(
        &self,
        body: &[u8],
    ) -> Result<HeartbeatResponse, ProtocolError> {
        HeartbeatResponse::parse(body)
    }
}
