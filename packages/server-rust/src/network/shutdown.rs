//! Graceful shutdown controller with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free health state transitions and an atomic
//! counter with RAII guards for accurate in-flight request tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Provider health state, transitioned by the shutdown controller.
///
/// State machine: Starting -> Serving -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Registration and binding still in progress, no dispatch yet.
    Starting,
    /// Fully operational, dispatching unit requests.
    Serving,
    /// Stop signal received, in-flight requests finishing, new dispatch
    /// requests rejected.
    Draining,
    /// Drain complete, nothing in flight.
    Stopped,
}

impl HealthState {
    /// Lowercase name used in health payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Coordinates graceful shutdown across the server:
/// 1. Health probes report `health_state()`
/// 2. The dispatcher checks the state before accepting a request
/// 3. `trigger_shutdown()` moves to Draining and signals all listeners
/// 4. `wait_for_drain()` blocks until in-flight requests complete
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    health_state: Arc<ArcSwap<HealthState>>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            health_state: Arc::new(ArcSwap::from_pointee(HealthState::Starting)),
        }
    }

    /// Transitions to `Serving` once the listener accepts requests.
    pub fn set_serving(&self) {
        self.health_state.store(Arc::new(HealthState::Serving));
    }

    /// Returns a receiver that is notified when shutdown is triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Initiates graceful shutdown.
    ///
    /// Transitions to `Draining` and signals all shutdown receivers. New
    /// dispatch requests are rejected from this point on.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
        // Ignore send errors -- receivers may have been dropped
        let _ = self.shutdown_signal.send(true);
    }

    /// Returns the current health state.
    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Creates an RAII guard tracking one in-flight request.
    ///
    /// The counter is incremented on creation and decremented when the
    /// guard drops, even if the handler panics.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Returns the current number of in-flight requests.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for all in-flight requests to complete, up to the given timeout.
    ///
    /// Returns `true` if everything drained (state moves to `Stopped`), or
    /// `false` when the timeout expired with requests still in flight
    /// (state stays `Draining`; abandoned requests observe their connection
    /// closing at process exit).
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            // Poll at 10ms intervals to avoid busy-waiting
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_starting() {
        let controller = ShutdownController::new();
        assert_eq!(controller.health_state(), HealthState::Starting);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[test]
    fn state_machine_advances_through_serving_and_draining() {
        let controller = ShutdownController::new();

        controller.set_serving();
        assert_eq!(controller.health_state(), HealthState::Serving);

        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Draining);
    }

    #[test]
    fn health_state_names_are_lowercase() {
        assert_eq!(HealthState::Starting.as_str(), "starting");
        assert_eq!(HealthState::Serving.as_str(), "serving");
        assert_eq!(HealthState::Draining.as_str(), "draining");
        assert_eq!(HealthState::Stopped.as_str(), "stopped");
    }

    #[test]
    fn in_flight_guard_increments_and_decrements() {
        let controller = ShutdownController::new();
        assert_eq!(controller.in_flight_count(), 0);

        let guard1 = controller.in_flight_guard();
        assert_eq!(controller.in_flight_count(), 1);

        let guard2 = controller.in_flight_guard();
        assert_eq!(controller.in_flight_count(), 2);

        drop(guard1);
        assert_eq!(controller.in_flight_count(), 1);

        drop(guard2);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_receiver_notified() {
        let controller = ShutdownController::new();
        let mut rx = controller.shutdown_receiver();

        // Not yet triggered
        assert!(!*rx.borrow());

        controller.trigger_shutdown();

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn wait_for_drain_immediate_success() {
        let controller = ShutdownController::new();
        controller.set_serving();
        controller.trigger_shutdown();

        // No in-flight requests, should drain immediately
        let drained = controller.wait_for_drain(Duration::from_secs(1)).await;
        assert!(drained);
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    async fn wait_for_drain_with_active_requests() {
        let controller = ShutdownController::new();
        controller.set_serving();

        let guard = controller.in_flight_guard();
        controller.trigger_shutdown();

        // Drop the guard after a short delay, as a finishing request would.
        let guard_handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        let drained = controller.wait_for_drain(Duration::from_secs(2)).await;
        assert!(drained);
        assert_eq!(controller.health_state(), HealthState::Stopped);

        guard_handle.await.unwrap();
    }

    #[tokio::test]
    async fn wait_for_drain_timeout() {
        let controller = ShutdownController::new();
        controller.set_serving();

        let _guard = controller.in_flight_guard();
        controller.trigger_shutdown();

        // Very short timeout -- should fail because guard is still held
        let drained = controller.wait_for_drain(Duration::from_millis(50)).await;
        assert!(!drained);
        // State should remain Draining on timeout
        assert_eq!(controller.health_state(), HealthState::Draining);
    }
}
