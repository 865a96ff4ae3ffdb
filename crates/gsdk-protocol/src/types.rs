//! Core protocol types for the heartbeat wire format.
//!
//! Everything here either travels to the agent inside a heartbeat request
//! or is handed to the game through a callback after arriving in a
//! heartbeat response.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The lifecycle stage this game server reports to the agent.
///
/// Exactly one value is current at any time and transitions are always
/// explicit:
///
/// ```text
/// Initializing ──(ready_for_players)──→ StandingBy ──(Active op)──→ Active
///       │                                   │                        │
///       └───────────────────────(Terminate op)───────────────────────┘
///                                           ▼
///                                      Terminating
/// ```
///
/// `Invalid`, `Terminated` and `Quarantined` exist because the agent knows
/// about them; the engine itself never enters them.
///
/// Serde serializes unit variants as their name, so `StandingBy` goes on
/// the wire as `"StandingBy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Invalid,
    Initializing,
    StandingBy,
    Active,
    Terminating,
    Terminated,
    Quarantined,
}

impl GameState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Invalid,
        Self::Initializing,
        Self::StandingBy,
        Self::Active,
        Self::Terminating,
        Self::Terminated,
        Self::Quarantined,
    ];

    /// The wire name of this state.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::Initializing => "Initializing",
            Self::StandingBy => "StandingBy",
            Self::Active => "Active",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
            Self::Quarantined => "Quarantined",
        }
    }

    /// Returns `true` once the server is on its way out. No transition
    /// back to `StandingBy` or `Active` is allowed from here.
    pub fn is_shutting_down(self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A directive received from the agent in a heartbeat response.
///
/// Only `Continue`, `Active` and `Terminate` have defined handling. The
/// others are known to the protocol but unsupported by this SDK; receiving
/// one is treated as protocol drift (logged and counted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Invalid,
    Continue,
    GetManifest,
    Quarantine,
    Active,
    Terminate,
    OperationCount,
}

impl Operation {
    /// The fixed name → operation table.
    pub const ALL: [Self; 7] = [
        Self::Invalid,
        Self::Continue,
        Self::GetManifest,
        Self::Quarantine,
        Self::Active,
        Self::Terminate,
        Self::OperationCount,
    ];

    /// The wire name of this operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::Continue => "Continue",
            Self::GetManifest => "GetManifest",
            Self::Quarantine => "Quarantine",
            Self::Active => "Active",
            Self::Terminate => "Terminate",
            Self::OperationCount => "OperationCount",
        }
    }

    /// Looks up an operation by wire name, ignoring ASCII case.
    ///
    /// Returns `None` for names outside the table.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Heartbeat request
// ---------------------------------------------------------------------------

/// Health as reported on the wire: `"Healthy"` or `"Unhealthy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameHealth {
    #[default]
    Healthy,
    Unhealthy,
}

impl From<bool> for GameHealth {
    fn from(healthy: bool) -> Self {
        if healthy {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }
}

/// A player currently connected to this game server.
///
/// `#[serde(rename_all = "PascalCase")]` produces `{"PlayerId": "..."}`,
/// which is what the agent expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectedPlayer {
    pub player_id: String,
}

impl ConnectedPlayer {
    /// Creates a connected player entry.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
        }
    }
}

/// The body of every heartbeat sent to the agent.
///
/// ```json
/// {
///   "CurrentGameState": "StandingBy",
///   "CurrentGameHealth": "Healthy",
///   "CurrentPlayers": [{ "PlayerId": "p1" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeartbeatRequest {
    pub current_game_state: GameState,
    pub current_game_health: GameHealth,
    pub current_players: Vec<ConnectedPlayer>,
}

/// A fresh server: initializing, healthy, nobody connected.
impl Default for HeartbeatRequest {
    fn default() -> Self {
        Self {
            current_game_state: GameState::Initializing,
            current_game_health: GameHealth::Healthy,
            current_players: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Maintenance schedule (v2)
// ---------------------------------------------------------------------------

/// Host-VM maintenance plan forwarded by the agent.
///
/// Unlike the rest of the response, these keys are PascalCase on the wire
/// (`DocumentIncarnation`, `Events`). Every field is optional; missing ones
/// take their default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MaintenanceSchedule {
    pub document_incarnation: String,
    pub events: Vec<MaintenanceEvent>,
}

/// One scheduled maintenance event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MaintenanceEvent {
    pub event_id: String,
    pub event_type: String,
    pub resource_type: String,
    pub resources: Vec<String>,
    pub event_status: String,
    /// Earliest time the event may start.
    pub not_before: Option<DateTime<Utc>>,
    pub description: String,
    pub event_source: String,
    pub duration_in_seconds: u64,
}

// =========================================================================
// Tests
// =========================================================================
