//! Wire protocol for the game server SDK.
//!
//! This crate defines the "language" spoken between a game server and the
//! orchestrating agent:
//!
//! - **Types** ([`GameState`], [`Operation`], [`HeartbeatRequest`],
//!   [`HeartbeatResponse`], etc.): the structures that travel in a
//!   heartbeat exchange.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw bytes over HTTP) and
//! the engine (state machine and callbacks). It never touches the network
//! and never mutates engine state; decoding only produces a description of
//! what the agent said.
//!
//! ```text
//! Transport (bytes) → Protocol (HeartbeatResponse) → Engine (state + callbacks)
//! ```

mod codec;
mod error;
mod response;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use response::{HeartbeatResponse, ReceivedOperation, SessionConfig, parse_utc_timestamp};
pub use types::{
    ConnectedPlayer, GameHealth, GameState, HeartbeatRequest, MaintenanceEvent,
    MaintenanceSchedule, Operation,
};
