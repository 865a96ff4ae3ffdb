//! Shared session state.
//!
//! Everything the application threads and the heartbeat thread both touch
//! lives here, split across three independent locks so unrelated work never
//! queues behind each other:
//!
//! | Lock        | Guards                                         |
//! |-------------|------------------------------------------------|
//! | `lifecycle` | game state, last reported health               |
//! | `players`   | connected players, initial players             |
//! | `config`    | config map, cached maintenance announcements   |
//!
//! No method holds more than one of these at a time, and none is held
//! across network I/O.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use gsdk_protocol::{
    ConnectedPlayer, GameHealth, GameState, HeartbeatRequest, MaintenanceSchedule,
};
use tracing::info;

use crate::gate::{Gate, lock};

/// Outcome of [`SessionState::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// The state moved; the heartbeat thread has been woken.
    Changed { from: GameState },
    /// Already in the requested state. Nothing was signaled.
    Unchanged,
    /// The guard rejected the move; `current` is what the state still is.
    Refused { current: GameState },
}

struct Lifecycle {
    state: GameState,
    health: GameHealth,
}

#[derive(Default)]
struct Players {
    connected: Vec<ConnectedPlayer>,
    initial: Vec<String>,
}

struct ConfigStore {
    values: BTreeMap<String, String>,
    last_maintenance: Option<DateTime<Utc>>,
    last_schedule: Option<MaintenanceSchedule>,
}

/// The mutable facts of one game server session.
pub(crate) struct SessionState {
    lifecycle: Mutex<Lifecycle>,
    players: Mutex<Players>,
    config: Mutex<ConfigStore>,

    /// Opened on every state change so the next heartbeat goes out now
    /// instead of after the current interval.
    pub(crate) heartbeat_due: Gate,
    /// Opened when waiting in `ready_for_players` is over: the server went
    /// active, is shutting down, or the engine is being dropped.
    pub(crate) became_active: Gate,
}

impl SessionState {
    pub(crate) fn new(config: BTreeMap<String, String>) -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle {
                state: GameState::Initializing,
                health: GameHealth::Healthy,
            }),
            players: Mutex::new(Players::default()),
            config: Mutex::new(ConfigStore {
                values: config,
                last_maintenance: None,
                last_schedule: None,
            }),
            heartbeat_due: Gate::new(),
            became_active: Gate::new(),
        }
    }

    // -- Lifecycle -----------------------------------------------------------

    pub(crate) fn game_state(&self) -> GameState {
        lock(&self.lifecycle).state
    }

    /// Moves to `next` if `allowed(current)` holds.
    ///
    /// The check and the swap happen under one lock acquisition, so a
    /// concurrent `Terminate` can never be overwritten by a transition that
    /// was decided against the older state.
    pub(crate) fn transition(
        &self,
        next: GameState,
        allowed: impl FnOnce(GameState) -> bool,
    ) -> Transition {
        let from = {
            let mut lifecycle = lock(&self.lifecycle);
            let current = lifecycle.state;
            if current == next {
                return Transition::Unchanged;
            }
            if !allowed(current) {
                return Transition::Refused { current };
            }
            lifecycle.state = next;
            current
        };

        info!(%from, to = %next, "game state changed");
        self.heartbeat_due.signal();
        Transition::Changed { from }
    }

    /// Unconditional [`transition`](Self::transition). Returns `true` if
    /// the state actually changed.
    pub(crate) fn set_state(&self, next: GameState) -> bool {
        matches!(self.transition(next, |_| true), Transition::Changed { .. })
    }

    pub(crate) fn set_health(&self, health: GameHealth) {
        lock(&self.lifecycle).health = health;
    }

    /// Snapshot of what the next heartbeat reports.
    pub(crate) fn heartbeat_request(&self) -> HeartbeatRequest {
        let (state, health) = {
            let lifecycle = lock(&self.lifecycle);
            (lifecycle.state, lifecycle.health)
        };
        HeartbeatRequest {
            current_game_state: state,
            current_game_health: health,
            current_players: lock(&self.players).connected.clone(),
        }
    }

    // -- Players -------------------------------------------------------------

    pub(crate) fn set_connected_players(&self, players: Vec<ConnectedPlayer>) {
        lock(&self.players).connected = players;
    }

    /// Stores the initial player list unless a non-empty one was stored
    /// before. An empty list means the agent has not allocated players yet.
    /// Returns `true` if `players` was taken.
    pub(crate) fn seed_initial_players(&self, players: Vec<String>) -> bool {
        let mut guard = lock(&self.players);
        if players.is_empty() || !guard.initial.is_empty() {
            return false;
        }
        guard.initial = players;
        true
    }

    pub(crate) fn initial_players(&self) -> Vec<String> {
        lock(&self.players).initial.clone()
    }

    // -- Config --------------------------------------------------------------

    /// Inserts or overwrites each entry. Keys are never removed.
    pub(crate) fn merge_config<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let mut config = lock(&self.config);
        for (key, value) in entries {
            config.values.insert(key.to_owned(), value.to_owned());
        }
    }

    /// The value for `key`, or an empty string if there is none.
    pub(crate) fn config_value(&self, key: &str) -> String {
        lock(&self.config)
            .values
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn config_settings(&self) -> BTreeMap<String, String> {
        lock(&self.config).values.clone()
    }

    /// Records a maintenance announcement. Returns `true` the first time a
    /// given time is seen.
    pub(crate) fn observe_maintenance(&self, at: DateTime<Utc>) -> bool {
        let mut config = lock(&self.config);
        if config.last_maintenance == Some(at) {
            return false;
        }
        config.last_maintenance = Some(at);
        true
    }

    /// Records a maintenance schedule. Returns `true` the first time a
    /// given schedule is seen.
    pub(crate) fn observe_schedule(&self, schedule: &MaintenanceSchedule) -> bool {
        let mut config = lock(&self.config);
        if config.last_schedule.as_ref() == Some(schedule) {
            return false;
        }
        config.last_schedule = Some(schedule.clone());
        true
    }
}

// =========================================================================
// Tests
// =========================================================================
