//! Callback slots the game registers with the engine.
//!
//! Each slot holds at most one function; registering again replaces it.
//! Invokers clone the `Arc` out of the slot and call it after the lock is
//! released, so a callback may itself register callbacks (or do anything
//! else) without deadlocking.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use gsdk_protocol::MaintenanceSchedule;
use tracing::error;

use crate::gate::lock;

pub(crate) type Action = Arc<dyn Fn() + Send + Sync>;
pub(crate) type HealthCheck = Arc<dyn Fn() -> bool + Send + Sync>;
pub(crate) type MaintenanceHandler = Arc<dyn Fn(DateTime<Utc>) + Send + Sync>;
pub(crate) type ScheduleHandler = Arc<dyn Fn(&MaintenanceSchedule) + Send + Sync>;

#[derive(Default)]
struct Slots {
    shutdown: Option<Action>,
    health: Option<HealthCheck>,
    server_active: Option<Action>,
    ready_for_players: Option<Action>,
    maintenance: Option<MaintenanceHandler>,
    maintenance_v2: Option<ScheduleHandler>,
}

#[derive(Default)]
pub(crate) struct Callbacks {
    slots: Mutex<Slots>,
}

impl Callbacks {
    pub(crate) fn set_shutdown(&self, f: Action) {
        lock(&self.slots).shutdown = Some(f);
    }

    pub(crate) fn set_health(&self, f: HealthCheck) {
        lock(&self.slots).health = Some(f);
    }

    pub(crate) fn set_server_active(&self, f: Action) {
        lock(&self.slots).server_active = Some(f);
    }

    pub(crate) fn set_ready_for_players(&self, f: Action) {
        lock(&self.slots).ready_for_players = Some(f);
    }

    pub(crate) fn set_maintenance(&self, f: MaintenanceHandler) {
        lock(&self.slots).maintenance = Some(f);
    }

    pub(crate) fn set_maintenance_v2(&self, f: ScheduleHandler) {
        lock(&self.slots).maintenance_v2 = Some(f);
    }

    pub(crate) fn shutdown(&self) -> Option<Action> {
        lock(&self.slots).shutdown.clone()
    }

    pub(crate) fn ready_for_players(&self) -> Option<Action> {
        lock(&self.slots).ready_for_players.clone()
    }

    // -- Heartbeat-thread invokers -------------------------------------------
    //
    // These run user code on the heartbeat thread. A panic there would end
    // heartbeating for good, so it is caught and logged instead.

    /// Asks the game whether it is healthy. `None` when no check is
    /// registered or the check panicked.
    pub(crate) fn check_health(&self) -> Option<bool> {
        let f = lock(&self.slots).health.clone()?;
        guarded("health", || f())
    }

    pub(crate) fn fire_server_active(&self) {
        let f = lock(&self.slots).server_active.clone();
        if let Some(f) = f {
            guarded("server active", || f());
        }
    }

    pub(crate) fn fire_maintenance(&self, at: DateTime<Utc>) {
        let f = lock(&self.slots).maintenance.clone();
        if let Some(f) = f {
            guarded("maintenance", || f(at));
        }
    }

    pub(crate) fn fire_maintenance_v2(&self, schedule: &MaintenanceSchedule) {
        let f = lock(&self.slots).maintenance_v2.clone();
        if let Some(f) = f {
            guarded("maintenance v2", || f(schedule));
        }
    }
}

/// Runs a game callback, turning a panic into an error log.
pub(crate) fn guarded<R>(name: &str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            error!(callback = name, "callback panicked");
            None
        }
    }
}
