//! HTTP handler definitions for the provider server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions used when building the
//! router.

pub mod dispatch;
pub mod health;

pub use dispatch::dispatch_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use unitdock_core::traits::UnitExecutor;

use super::ShutdownController;
use crate::discovery::DispatchTable;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap. The
/// dispatch table is immutable for the lifetime of the process; handlers
/// read it without locking.
#[derive(Clone)]
pub struct AppState {
    /// Service path to unit source mapping, built once at startup.
    pub dispatch: Arc<DispatchTable>,
    /// Executor invoked for each dispatched request.
    pub executor: Arc<dyn UnitExecutor>,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
