//! # gsdk
//!
//! Game server SDK for agent-orchestrated game servers.
//!
//! A game server process embeds one [`GameServerSdk`]. The engine
//! heartbeats to the local agent on a background thread, reporting the
//! server's state, health and connected players, and reacts to what the
//! agent sends back: allocation (`Active`), termination, maintenance
//! notices and session configuration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gsdk::prelude::*;
//!
//! let sdk = GameServerSdk::start(Configuration::load()?)?;
//! sdk.register_shutdown_callback(|| std::process::exit(0));
//!
//! // Blocks until the agent allocates this server.
//! if sdk.ready_for_players() {
//!     sdk.update_connected_players([ConnectedPlayer::new("player-1")]);
//! }
//! # Ok::<(), GsdkError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! application threads                     heartbeat thread
//! ───────────────────                     ────────────────
//! ready_for_players ─┐                ┌─→ wait(heartbeat_due, interval)
//! update_players ────┼→ SessionState ─┤   encode → PATCH → decode
//! register_*  ───────┘   (3 locks)    └─← apply: state, config, callbacks
//! ```

mod callbacks;
mod engine;
mod error;
mod gate;
mod heartbeat;
mod logging;
mod state;

pub use engine::GameServerSdk;
pub use error::GsdkError;
pub use gate::Gate;
pub use heartbeat::LoopPhase;

pub use gsdk_config::{Configuration, GamePort, GameServerConnectionInfo, keys};
pub use gsdk_protocol::{ConnectedPlayer, GameState, MaintenanceEvent, MaintenanceSchedule};

/// Everything a game server usually needs, in one import.
pub mod prelude {
    pub use crate::{
        ConnectedPlayer, Configuration, GameServerSdk, GameState, GsdkError,
        MaintenanceSchedule,
    };
}
