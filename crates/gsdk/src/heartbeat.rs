//! The heartbeat thread.
//!
//! One dedicated OS thread per engine. Each cycle it waits on the
//! "heartbeat due" gate for up to the current interval, sends one
//! heartbeat, and applies whatever the agent answered:
//!
//! ```text
//!          ┌──────────────────────────────────────────────────┐
//!          ▼                                                  │
//!   wait(heartbeat_due, interval) → encode → PATCH → decode → apply
//!          │                                   ▲
//!      not running                        cancelled on stop
//!          ▼
//!       Stopped
//! ```
//!
//! The PATCH itself is async (that's what `reqwest` gives us), so the
//! thread owns a small current-thread Tokio runtime and blocks on each
//! exchange. Blocking is fine here: this thread does nothing else.
//! Stopping flips a watch channel that every in-flight exchange is raced
//! against, so a slow agent can never hold up engine teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gsdk_config::Configuration;
use gsdk_protocol::{Codec, GameState, HeartbeatResponse, Operation, ReceivedOperation};
use gsdk_transport::Transport;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::engine::Shared;
use crate::gate::lock;
use crate::state::Transition;

// ---------------------------------------------------------------------------
// LoopControl: the loop's own state machine
// ---------------------------------------------------------------------------

/// Where the heartbeat loop is in its life.
///
/// ```text
/// Running ──(stop requested)──→ Stopping ──(thread exits)──→ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Running,
    Stopping,
    Stopped,
}

/// Shared switch between the engine and the heartbeat thread.
pub(crate) struct LoopControl {
    phase: Mutex<LoopPhase>,
    cancel: watch::Sender<bool>,
}

impl LoopControl {
    /// A control for a loop that is about to start, or for no loop at all
    /// (`running == false`), which starts out `Stopped`.
    pub(crate) fn new(running: bool) -> Self {
        let phase = if running {
            LoopPhase::Running
        } else {
            LoopPhase::Stopped
        };
        let (cancel, _) = watch::channel(false);
        Self {
            phase: Mutex::new(phase),
            cancel,
        }
    }

    pub(crate) fn phase(&self) -> LoopPhase {
        *lock(&self.phase)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase() == LoopPhase::Running
    }

    /// Moves `Running` to `Stopping` and cancels any in-flight exchange.
    /// Returns `true` only for the call that made the move.
    pub(crate) fn request_stop(&self) -> bool {
        let mut phase = lock(&self.phase);
        if *phase != LoopPhase::Running {
            return false;
        }
        *phase = LoopPhase::Stopping;
        self.cancel.send_replace(true);
        true
    }

    fn mark_stopped(&self) {
        *lock(&self.phase) = LoopPhase::Stopped;
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }
}

// ---------------------------------------------------------------------------
// HeartbeatLoop
// ---------------------------------------------------------------------------

/// Everything the heartbeat thread owns. Built on the caller's thread so
/// setup errors surface from engine construction, then moved into the
/// spawned thread.
pub(crate) struct HeartbeatLoop<T: Transport, C: Codec> {
    shared: Arc<Shared>,
    transport: T,
    codec: C,
    runtime: tokio::runtime::Runtime,
    cancelled: watch::Receiver<bool>,
    url: String,
    floor: Duration,
    interval: Duration,
    max_unexpected: u32,
    unexpected: u32,
}

impl<T: Transport, C: Codec> HeartbeatLoop<T, C> {
    pub(crate) fn new(
        shared: Arc<Shared>,
        transport: T,
        codec: C,
        config: &Configuration,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let cancelled = shared.control.subscribe();
        Ok(Self {
            shared,
            transport,
            codec,
            runtime,
            cancelled,
            url: config.heartbeat_url(),
            floor: config.minimum_heartbeat_interval,
            interval: config.minimum_heartbeat_interval,
            max_unexpected: config.max_unexpected_operations,
            unexpected: 0,
        })
    }

    /// Runs until the loop is told to stop.
    pub(crate) fn run(mut self) {
        info!(url = %self.url, interval = ?self.interval, "heartbeat thread started");
        let shared = Arc::clone(&self.shared);

        while shared.control.is_running() {
            if shared.session.heartbeat_due.wait_timeout(self.interval) {
                shared.session.heartbeat_due.reset();
            }
            if !shared.control.is_running() {
                break;
            }
            self.beat();
        }

        shared.control.mark_stopped();
        info!("heartbeat thread stopped");
    }

    /// One request/response exchange.
    fn beat(&mut self) {
        if let Some(healthy) = self.shared.callbacks.check_health() {
            self.shared.session.set_health(healthy.into());
        }

        let request = self.shared.session.heartbeat_request();
        let body = match self.codec.encode_request(&request) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "cannot encode heartbeat");
                return;
            }
        };
        trace!(
            state = %request.current_game_state,
            players = request.current_players.len(),
            "sending heartbeat"
        );

        let Self {
            runtime,
            transport,
            url,
            cancelled,
            ..
        } = self;
        let outcome = runtime.block_on(async {
            tokio::select! {
                result = transport.patch(url.as_str(), body) => Some(result),
                _ = cancelled.wait_for(|stop| *stop) => None,
            }
        });

        let response = match outcome {
            None => {
                debug!("heartbeat cancelled by shutdown");
                return;
            }
            Some(Err(e)) => {
                warn!(error = %e, "heartbeat failed");
                return;
            }
            Some(Ok(response)) => response,
        };

        if !response.is_success() {
            warn!(
                status = response.status,
                body = %response.body_text(),
                "agent rejected heartbeat"
            );
            return;
        }

        match self.codec.decode_response(&response.body) {
            Ok(decoded) => self.apply(decoded),
            Err(e) => warn!(
                error = %e,
                body = %response.body_text(),
                "cannot parse heartbeat response"
            ),
        }
    }

    /// Applies one decoded response, field by field.
    fn apply(&mut self, response: HeartbeatResponse) {
        let shared = Arc::clone(&self.shared);
        let session = &shared.session;

        for note in &response.skipped {
            warn!(%note, "ignored heartbeat response field");
        }

        if let Some(config) = response.session_config {
            session.merge_config(config.config_entries());
            if let Some(players) = config.initial_players {
                let count = players.len();
                if session.seed_initial_players(players) {
                    info!(count, "initial players received");
                }
            }
        }

        if let Some(at) = response.next_scheduled_maintenance_utc {
            if session.observe_maintenance(at) {
                info!(%at, "maintenance scheduled");
                shared.callbacks.fire_maintenance(at);
            }
        }

        if let Some(schedule) = response.maintenance_schedule {
            if session.observe_schedule(&schedule) {
                info!(
                    incarnation = %schedule.document_incarnation,
                    events = schedule.events.len(),
                    "maintenance schedule received"
                );
                shared.callbacks.fire_maintenance_v2(&schedule);
            }
        }

        if let Some(operation) = response.operation {
            self.apply_operation(operation);
        }

        self.interval = next_interval(response.next_heartbeat_interval_ms, self.floor);
    }

    fn apply_operation(&mut self, operation: ReceivedOperation) {
        let shared = Arc::clone(&self.shared);

        match operation {
            ReceivedOperation::Known(Operation::Continue) => {
                self.unexpected = 0;
            }
            ReceivedOperation::Known(Operation::Active) => {
                self.unexpected = 0;
                match shared
                    .session
                    .transition(GameState::Active, |current| !current.is_shutting_down())
                {
                    Transition::Changed { .. } => {
                        shared.session.became_active.signal();
                        shared.callbacks.fire_server_active();
                    }
                    Transition::Unchanged => {}
                    Transition::Refused { current } => {
                        debug!(%current, "ignoring Active while shutting down");
                    }
                }
            }
            ReceivedOperation::Known(Operation::Terminate) => {
                self.unexpected = 0;
                let outcome = shared
                    .session
                    .transition(GameState::Terminating, |current| !current.is_shutting_down());
                if matches!(outcome, Transition::Changed { .. }) {
                    shared.shut_down();
                }
            }
            ReceivedOperation::Known(other) => {
                error!(operation = %other, "unhandled operation");
                self.count_unexpected();
            }
            ReceivedOperation::Unknown(name) => {
                error!(operation = %name, "unknown operation");
                self.count_unexpected();
            }
        }
    }

    fn count_unexpected(&mut self) {
        self.unexpected = self.unexpected.saturating_add(1);
        if self.unexpected >= self.max_unexpected {
            error!(
                count = self.unexpected,
                max = self.max_unexpected,
                "too many unexpected operations, shutting down"
            );
            self.shared.shut_down();
        }
    }
}

/// The agent's requested interval, never below `floor`. No request means
/// the floor.
fn next_interval(requested_ms: Option<u64>, floor: Duration) -> Duration {
    requested_ms
        .map(Duration::from_millis)
        .map_or(floor, |requested| requested.max(floor))
}

// =========================================================================
// Tests
// =========================================================================
