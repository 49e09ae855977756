//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! requests. The gap between `start()` and `serve()` is where the
//! provider registers itself with the core systems, so the advertised
//! port is the port actually bound (relevant when port 0 is configured).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use unitdock_core::traits::UnitExecutor;

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    dispatch_handler, health_handler, liveness_handler, readiness_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::discovery::DispatchTable;

/// Manages the HTTP server lifecycle around the dispatch table.
///
/// 1. `new()` -- allocates shared state (table, executor, shutdown controller)
/// 2. `start()` -- binds the TCP listener and reports the bound port
/// 3. `serve()` -- accepts requests until the shutdown future resolves
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    dispatch: Arc<DispatchTable>,
    executor: Arc<dyn UnitExecutor>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        dispatch: Arc<DispatchTable>,
        executor: Arc<dyn UnitExecutor>,
    ) -> Self {
        Self {
            config,
            listener: None,
            dispatch,
            executor,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    /// - `POST /{*path}` -- unit dispatch for every discovered service path
    pub fn build_router(&self) -> Router {
        let state = AppState {
            dispatch: Arc::clone(&self.dispatch),
            executor: Arc::clone(&self.executor),
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
        };
        assemble_router(&self.config, state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving requests until the shutdown future resolves.
    ///
    /// Consumes `self` because the listener is moved into the server.
    /// When the shutdown future fires, the health state flips to Draining
    /// (new dispatch requests get 503), the listener stops accepting, and
    /// in-flight requests are given `drain_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let dispatch = self.dispatch;
        let executor = self.executor;
        let shutdown_ctrl = self.shutdown;
        let config = self.config;

        let state = AppState {
            dispatch,
            executor,
            shutdown: Arc::clone(&shutdown_ctrl),
            start_time: Instant::now(),
        };
        let router = assemble_router(&config, state);

        // Transition to Serving so readiness probes pass and dispatch is
        // accepted.
        shutdown_ctrl.set_serving();

        if let Some(ref tls) = config.tls {
            serve_tls(
                listener,
                router,
                tls,
                shutdown_ctrl,
                config.drain_timeout,
                shutdown,
            )
            .await
        } else {
            serve_plain(listener, router, shutdown_ctrl, config.drain_timeout, shutdown).await
        }
    }
}

fn assemble_router(config: &NetworkConfig, state: AppState) -> Router {
    let layers = build_http_layers(config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/{*path}", post(dispatch_handler))
        .layer(layers)
        .with_state(state)
}

/// Serves plain HTTP using axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown_ctrl: Arc<ShutdownController>,
    drain_timeout: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP");

    let ctrl = Arc::clone(&shutdown_ctrl);
    let graceful = async move {
        shutdown.await;
        // Flip to Draining before the listener stops accepting, so any
        // request that still arrives gets 503 instead of hanging.
        ctrl.trigger_shutdown();
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful)
        .await?;

    finish_drain(&shutdown_ctrl, drain_timeout).await;
    Ok(())
}

/// Serves TLS using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener by converting it to a
/// `std::net::TcpListener`.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown_ctrl: Arc<ShutdownController>,
    drain_timeout: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    let ctrl = Arc::clone(&shutdown_ctrl);

    // Wait for the stop signal, flip to Draining, then wind the server
    // down with the drain timeout as the hard bound on open connections.
    tokio::spawn(async move {
        shutdown.await;
        ctrl.trigger_shutdown();
        shutdown_handle.graceful_shutdown(Some(drain_timeout));
    });

    info!("serving TLS on {addr}");

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    finish_drain(&shutdown_ctrl, drain_timeout).await;
    Ok(())
}

/// Waits for in-flight requests after the serving loop has exited.
async fn finish_drain(shutdown_ctrl: &ShutdownController, drain_timeout: Duration) {
    // The serving loop can also exit without the signal path having run
    // (fatal I/O error), so make sure the state is Draining either way.
    shutdown_ctrl.trigger_shutdown();

    if shutdown_ctrl.wait_for_drain(drain_timeout).await {
        info!("all in-flight requests drained");
    } else {
        warn!(
            in_flight = shutdown_ctrl.in_flight_count(),
            "drain timeout expired with requests in flight"
        );
    }
}
