//! `GameServerSdk`, the engine's public surface.
//!
//! This is the entry point for a game server. It ties together all the
//! layers: configuration → session state → heartbeat thread → transport.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use gsdk_config::{Configuration, GameServerConnectionInfo};
use gsdk_protocol::{ConnectedPlayer, GameState, JsonCodec, MaintenanceSchedule};
use gsdk_transport::{HttpTransport, Transport};
use tracing::{error, info, warn};

use crate::GsdkError;
use crate::callbacks::Callbacks;
use crate::heartbeat::{HeartbeatLoop, LoopControl, LoopPhase};
use crate::logging;
use crate::state::{SessionState, Transition};

/// State shared between the engine handle and the heartbeat thread.
pub(crate) struct Shared {
    pub(crate) session: SessionState,
    pub(crate) callbacks: Callbacks,
    pub(crate) control: LoopControl,
}

impl Shared {
    pub(crate) fn new(config: &Configuration) -> Self {
        Self {
            session: SessionState::new(config.config_map()),
            callbacks: Callbacks::default(),
            control: LoopControl::new(config.should_heartbeat),
        }
    }

    /// Stops heartbeating and runs the game's shutdown callback.
    ///
    /// Safe to call more than once; only the call that actually stops the
    /// loop runs the callback.
    pub(crate) fn shut_down(&self) {
        let first = self.control.request_stop();
        self.release_waiters();
        if !first {
            return;
        }

        let Some(callback) = self.callbacks.shutdown() else {
            warn!("shutting down with no shutdown callback registered");
            return;
        };

        // Off the heartbeat thread: the callback may well drop the engine,
        // and dropping the engine joins the heartbeat thread.
        let spawned = thread::Builder::new()
            .name("gsdk-shutdown".into())
            .spawn(move || {
                crate::callbacks::guarded("shutdown", || callback());
            });
        if let Err(e) = spawned {
            error!(error = %e, "cannot spawn shutdown callback thread");
        }
    }

    /// Wakes the heartbeat thread and every `ready_for_players` caller so
    /// each can observe the new phase.
    fn release_waiters(&self) {
        self.session.became_active.signal();
        self.session.heartbeat_due.signal();
    }
}

/// A running game server session.
///
/// Construct one per process with [`start`](Self::start) (or
/// [`with_transport`](Self::with_transport) to supply the transport), keep
/// it alive for as long as the server runs, and drop it to stop
/// heartbeating. Every method takes `&self`; wrap the engine in an `Arc` to
/// call it from several threads.
///
/// # Example
///
/// ```rust,no_run
/// use gsdk::prelude::*;
///
/// let sdk = GameServerSdk::start(Configuration::load()?)?;
///
/// sdk.register_shutdown_callback(|| println!("agent asked us to stop"));
/// sdk.register_health_callback(|| true);
///
/// if sdk.ready_for_players() {
///     let players = sdk.initial_players();
///     println!("allocated with {} players", players.len());
/// }
/// # Ok::<(), gsdk::GsdkError>(())
/// ```
pub struct GameServerSdk {
    shared: Arc<Shared>,
    connection_info: Option<GameServerConnectionInfo>,
    heartbeat: Option<JoinHandle<()>>,
}

impl GameServerSdk {
    /// Starts the engine, heartbeating over HTTP.
    ///
    /// # Errors
    /// See [`with_transport`](Self::with_transport); additionally
    /// [`GsdkError::Transport`] if the HTTP client cannot be built.
    pub fn start(config: Configuration) -> Result<Self, GsdkError> {
        let transport = HttpTransport::new()?;
        Self::with_transport(config, transport)
    }

    /// Starts the engine with the given transport.
    ///
    /// Validates the configuration, sets up file logging if enabled, and
    /// spawns the heartbeat thread. Nothing is spawned if this fails.
    ///
    /// # Errors
    /// - [`GsdkError::Config`] if the heartbeat endpoint or server id is
    ///   missing.
    /// - [`GsdkError::Logging`] if the log file cannot be created.
    /// - [`GsdkError::Runtime`] if the heartbeat thread cannot be started.
    pub fn with_transport<T: Transport>(
        config: Configuration,
        transport: T,
    ) -> Result<Self, GsdkError> {
        config.validate()?;
        let config = config.validated();

        if config.should_log {
            if let Some(path) =
                logging::install(&config.log_folder).map_err(GsdkError::Logging)?
            {
                info!(path = %path.display(), "SDK log file opened");
            }
        }

        info!(
            endpoint = %config.heartbeat_endpoint,
            server_id = %config.server_id,
            "game server SDK starting"
        );

        let shared = Arc::new(Shared::new(&config));

        let heartbeat = if config.should_heartbeat {
            let heartbeat =
                HeartbeatLoop::new(Arc::clone(&shared), transport, JsonCodec, &config)
                    .map_err(GsdkError::Runtime)?;
            let handle = thread::Builder::new()
                .name("gsdk-heartbeat".into())
                .spawn(move || heartbeat.run())
                .map_err(GsdkError::Runtime)?;
            Some(handle)
        } else {
            info!("heartbeat disabled by configuration");
            None
        };

        Ok(Self {
            shared,
            connection_info: config.connection_info,
            heartbeat,
        })
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Tells the agent this server is ready and blocks until it is
    /// allocated or told to shut down.
    ///
    /// Returns `true` once the state is `Active` (immediately, if it
    /// already is) and `false` if the server is terminating instead. When
    /// heartbeating is off nothing could ever activate the server, so this
    /// returns at once.
    pub fn ready_for_players(&self) -> bool {
        let session = &self.shared.session;

        if !self.shared.control.is_running() {
            warn!("ready_for_players called while heartbeat is not running");
            return session.game_state() == GameState::Active;
        }

        let standby = session.transition(GameState::StandingBy, |current| {
            current != GameState::Active && !current.is_shutting_down()
        });
        match standby {
            Transition::Changed { .. } => {
                if let Some(callback) = self.shared.callbacks.ready_for_players() {
                    callback();
                }
            }
            Transition::Unchanged => {}
            Transition::Refused { current } => return current == GameState::Active,
        }

        session.became_active.wait();
        session.game_state() == GameState::Active
    }

    /// Replaces the list of connected players reported on the next
    /// heartbeat. No request is sent right away.
    pub fn update_connected_players(&self, players: impl IntoIterator<Item = ConnectedPlayer>) {
        self.shared
            .session
            .set_connected_players(players.into_iter().collect());
    }

    /// The state this server currently reports.
    pub fn game_state(&self) -> GameState {
        self.shared.session.game_state()
    }

    /// Whether the heartbeat thread is running, stopping or gone.
    pub fn heartbeat_phase(&self) -> LoopPhase {
        self.shared.control.phase()
    }

    // -- Callbacks ----------------------------------------------------------

    /// Called once, on its own thread, when the agent terminates this
    /// server or the engine gives up on it.
    pub fn register_shutdown_callback(&self, f: impl Fn() + Send + Sync + 'static) {
        self.shared.callbacks.set_shutdown(Arc::new(f));
    }

    /// Asked before every heartbeat. Without one the server reports
    /// healthy.
    pub fn register_health_callback(&self, f: impl Fn() -> bool + Send + Sync + 'static) {
        self.shared.callbacks.set_health(Arc::new(f));
    }

    /// Called when the agent moves this server to `Active`.
    pub fn register_server_active_callback(&self, f: impl Fn() + Send + Sync + 'static) {
        self.shared.callbacks.set_server_active(Arc::new(f));
    }

    /// Called on the caller's thread when `ready_for_players` moves the
    /// server to `StandingBy`.
    pub fn register_ready_for_players_callback(&self, f: impl Fn() + Send + Sync + 'static) {
        self.shared.callbacks.set_ready_for_players(Arc::new(f));
    }

    /// Called once per distinct maintenance time the agent announces.
    pub fn register_maintenance_callback(
        &self,
        f: impl Fn(DateTime<Utc>) + Send + Sync + 'static,
    ) {
        self.shared.callbacks.set_maintenance(Arc::new(f));
    }

    /// Called once per distinct maintenance schedule the agent announces.
    pub fn register_maintenance_v2_callback(
        &self,
        f: impl Fn(&MaintenanceSchedule) + Send + Sync + 'static,
    ) {
        self.shared.callbacks.set_maintenance_v2(Arc::new(f));
    }

    // -- Reads --------------------------------------------------------------

    /// A config value by key, or an empty string. See
    /// [`gsdk_config::keys`] for the well-known keys.
    pub fn config_value(&self, key: &str) -> String {
        self.shared.session.config_value(key)
    }

    /// A snapshot of the whole config map.
    pub fn config_settings(&self) -> BTreeMap<String, String> {
        self.shared.session.config_settings()
    }

    /// The players the agent allocated this server for. Empty until the
    /// first heartbeat response that carries them.
    pub fn initial_players(&self) -> Vec<String> {
        self.shared.session.initial_players()
    }

    pub fn connection_info(&self) -> Option<&GameServerConnectionInfo> {
        self.connection_info.as_ref()
    }

    /// Writes a line from the game into the SDK log.
    pub fn log_message(&self, message: impl AsRef<str>) {
        info!(target: "gsdk::game", "{}", message.as_ref());
    }
}

impl Drop for GameServerSdk {
    fn drop(&mut self) {
        self.shared.control.request_stop();
        self.shared.release_waiters();

        let Some(handle) = self.heartbeat.take() else {
            return;
        };
        // Dropped from one of our own callbacks: the thread exits on its
        // own once the callback returns.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("heartbeat thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gsdk_transport::{HttpResponse, TransportError};

    use super::*;

    struct NeverCalled;

    impl Transport for NeverCalled {
        async fn patch(&self, _url: &str, _body: Vec<u8>) -> Result<HttpResponse, TransportError> {
            unreachable!("heartbeat is disabled in these tests")
        }
    }

    fn offline_config() -> Configuration {
        Configuration {
            should_log: false,
            should_heartbeat: false,
            ..Configuration::new("127.0.0.1:56001", "host-1")
        }
    }

    #[test]
    fn test_with_transport_missing_server_id_fails() {
        let config = Configuration {
            should_log: false,
            ..Configuration::new("127.0.0.1:56001", "")
        };
        let result = GameServerSdk::with_transport(config, NeverCalled);
        assert!(matches!(result, Err(GsdkError::Config(_))));
    }

    #[test]
    fn test_ready_for_players_without_heartbeat_returns_false() {
        let sdk = GameServerSdk::with_transport(offline_config(), NeverCalled).unwrap();
        assert_eq!(sdk.heartbeat_phase(), LoopPhase::Stopped);
        assert!(!sdk.ready_for_players());
        assert_eq!(sdk.game_state(), GameState::Initializing);
    }

    #[test]
    fn test_config_reads_start_from_configuration() {
        let mut config = offline_config();
        config.title_id = "ABCD".into();
        config.game_ports.insert("game_port".into(), "7777".into());
        let sdk = GameServerSdk::with_transport(config, NeverCalled).unwrap();

        assert_eq!(sdk.config_value(gsdk_config::keys::TITLE_ID_KEY), "ABCD");
        assert_eq!(sdk.config_value("game_port"), "7777");
        assert_eq!(sdk.config_value("missing"), "");
        assert_eq!(
            sdk.config_settings()[gsdk_config::keys::SERVER_ID_KEY],
            "host-1"
        );
        assert!(sdk.initial_players().is_empty());
    }

    #[test]
    fn test_connection_info_passed_through() {
        let mut config = offline_config();
        config.connection_info = Some(GameServerConnectionInfo {
            public_ipv4_address: "20.1.2.3".into(),
            game_ports_configuration: Vec::new(),
        });
        let sdk = GameServerSdk::with_transport(config, NeverCalled).unwrap();

        assert_eq!(
            sdk.connection_info().map(|c| c.public_ipv4_address.as_str()),
            Some("20.1.2.3")
        );
    }

    #[test]
    fn test_update_connected_players_shows_in_next_request() {
        let sdk = GameServerSdk::with_transport(offline_config(), NeverCalled).unwrap();
        sdk.update_connected_players(vec![ConnectedPlayer::new("a"), ConnectedPlayer::new("b")]);

        let request = sdk.shared.session.heartbeat_request();
        assert_eq!(request.current_players.len(), 2);
        assert_eq!(request.current_players[0].player_id, "a");
    }

    #[test]
    fn test_shut_down_runs_callback_once() {
        let config = Configuration {
            should_log: false,
            ..Configuration::new("127.0.0.1:56001", "host-1")
        };
        let shared = Shared::new(&config);
        let (tx, rx) = std::sync::mpsc::channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        shared.callbacks.set_shutdown(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        }));

        shared.shut_down();
        shared.shut_down();

        rx.recv_timeout(std::time::Duration::from_secs(5))
            .expect("callback should run");
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(shared.session.became_active.is_set());
    }
}
