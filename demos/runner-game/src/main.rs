//! A stand-in game server that walks through the whole session lifecycle:
//! start, report ready, get allocated, run a match, and exit when the agent
//! says so.
//!
//! Run it under an agent (or point `HEARTBEAT_ENDPOINT` / `SESSION_HOST_ID`
//! at a mock one). Logs go to stderr because a subscriber is installed
//! before the SDK starts; unset that and the SDK writes its own log file.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use gsdk::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Match simulation
// ---------------------------------------------------------------------------

/// Who is in the match after `tick` ticks: initial players trickle in one
/// per tick, and everyone but the last leaves once the match is over.
fn roster(initial: &[String], tick: usize, match_over: bool) -> Vec<ConnectedPlayer> {
    let joined = tick.min(initial.len());
    let present = if match_over { joined.min(1) } else { joined };
    initial[..present]
        .iter()
        .map(|id| ConnectedPlayer::new(id.as_str()))
        .collect()
}

const MATCH_TICKS: usize = 10;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), GsdkError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let sdk = GameServerSdk::start(Configuration::load()?)?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    sdk.register_shutdown_callback(move || {
        let _ = shutdown_tx.send(());
    });

    let healthy = Arc::new(AtomicBool::new(true));
    let health = Arc::clone(&healthy);
    sdk.register_health_callback(move || health.load(Ordering::Relaxed));

    sdk.register_maintenance_callback(|at| warn!(%at, "host maintenance announced"));
    sdk.register_maintenance_v2_callback(|schedule| {
        for event in &schedule.events {
            warn!(
                event = %event.event_type,
                status = %event.event_status,
                not_before = ?event.not_before,
                "host maintenance event"
            );
        }
    });

    if let Some(info) = sdk.connection_info() {
        for port in &info.game_ports_configuration {
            info!(
                name = %port.name,
                listen = port.server_listening_port,
                public = port.client_connection_port,
                "game port"
            );
        }
    }

    info!("waiting for allocation");
    if !sdk.ready_for_players() {
        info!("terminated before allocation");
        return Ok(());
    }

    let initial = sdk.initial_players();
    info!(
        players = initial.len(),
        session = %sdk.config_value(gsdk::keys::SESSION_ID_KEY),
        "allocated"
    );
    sdk.log_message(format!("match starting with {} players", initial.len()));

    for tick in 1..=MATCH_TICKS {
        sdk.update_connected_players(roster(&initial, tick, false));
        if shutdown_rx.recv_timeout(Duration::from_secs(1)).is_ok() {
            info!(tick, "shutdown requested mid-match");
            return Ok(());
        }
    }

    sdk.update_connected_players(roster(&initial, MATCH_TICKS, true));
    sdk.log_message("match over");
    healthy.store(false, Ordering::Relaxed);

    // The agent decides when this process ends.
    let _ = shutdown_rx.recv();
    info!("bye");
    Ok(())
}
