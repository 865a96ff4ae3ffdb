//! A boolean latch threads can block on.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Locks `mutex`, recovering the data if a previous holder panicked.
///
/// Every mutex in this crate guards plain data that is valid after any
/// partial update, so poisoning carries no information worth a panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A manual-reset event: once [signaled](Self::signal) it stays open,
/// releasing every current and future waiter, until [`reset`](Self::reset).
///
/// The engine uses two of these: "heartbeat due" (wakes the heartbeat
/// thread early after a state change) and "became active" (releases
/// `ready_for_players`).
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use gsdk::Gate;
///
/// let gate = Arc::new(Gate::new());
/// let opener = Arc::clone(&gate);
/// std::thread::spawn(move || opener.signal());
///
/// gate.wait();
/// assert!(gate.is_set());
/// assert!(gate.wait_timeout(Duration::from_millis(1)));
/// ```
#[derive(Debug, Default)]
pub struct Gate {
    set: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate and wakes every waiter.
    pub fn signal(&self) {
        *lock(&self.set) = true;
        self.changed.notify_all();
    }

    /// Closes the gate. Threads already released are unaffected.
    pub fn reset(&self) {
        *lock(&self.set) = false;
    }

    /// Returns `true` if the gate is open right now.
    pub fn is_set(&self) -> bool {
        *lock(&self.set)
    }

    /// Blocks until the gate is open. Returns at once if it already is.
    pub fn wait(&self) {
        let mut set = lock(&self.set);
        while !*set {
            set = self
                .changed
                .wait(set)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the gate is open or `timeout` elapses.
    ///
    /// Returns `true` if the gate was open when the call returned.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let set = lock(&self.set);
        let (set, _) = self
            .changed
            .wait_timeout_while(set, timeout, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
        *set
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_new_gate_is_closed() {
        assert!(!Gate::new().is_set());
    }

    #[test]
    fn test_wait_timeout_closed_gate_times_out() {
        let gate = Gate::new();
        let start = Instant::now();
        assert!(!gate.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_signal_before_wait_returns_immediately() {
        let gate = Gate::new();
        gate.signal();
        gate.wait();
        assert!(gate.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_signal_releases_all_waiters() {
        let gate = Arc::new(Gate::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.wait_timeout(Duration::from_secs(5)))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        gate.signal();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }

    #[test]
    fn test_reset_closes_gate_again() {
        let gate = Gate::new();
        gate.signal();
        gate.reset();
        assert!(!gate.is_set());
        assert!(!gate.wait_timeout(Duration::from_millis(5)));
    }
}
