//! Process supervisor: wires discovery, registration, serving, and teardown.
//!
//! `run` owns the whole provider lifetime. The order matters: the listener
//! is bound before anything is registered, so the advertised port is always
//! the port actually bound and a bind failure exits before the registry has
//! been touched. After the serving loop exits, teardown runs exactly once,
//! regardless of whether serving ended in a signal or an error.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use unitdock_core::traits::UnitExecutor;
use unitdock_core::types::{ProviderSystem, ServiceDescriptor, SystemId};

use crate::config::Config;
use crate::discovery::{self, DiscoveryError, DispatchTable};
use crate::executor::ProcessUnitExecutor;
use crate::lifecycle::{LifecycleManager, StartupError};
use crate::network::{NetworkConfig, NetworkModule};
use crate::registry::{ClientBuildError, HttpRegistryClient};

/// Fatal errors that end the provider process.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The unit root could not be scanned.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The registry HTTP client could not be built from the configured
    /// identity material.
    #[error(transparent)]
    Client(#[from] ClientBuildError),

    /// The mandatory part of the startup sequence failed.
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// The listener could not be bound.
    #[error("cannot bind listener: {0}")]
    Bind(#[source] anyhow::Error),

    /// The serving loop ended with an I/O error.
    #[error("serving failed: {0}")]
    Serve(#[source] anyhow::Error),
}

impl SupervisorError {
    /// Process exit code for this error.
    ///
    /// A failed mandatory system registration exits with 127, the code
    /// consumers in the local cloud key their monitoring on. Every other
    /// fatal error exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Startup(StartupError::SystemRegistration(_)) => 127,
            _ => 1,
        }
    }
}

/// Runs the provider until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns a [`SupervisorError`] for fatal startup or serving failures;
/// see [`SupervisorError::exit_code`] for the resulting process status.
pub async fn run(config: Config) -> Result<(), SupervisorError> {
    run_until(config, shutdown_signal()).await
}

/// Runs the provider until the given shutdown future resolves.
///
/// Split from [`run`] so tests can drive the full lifecycle with their own
/// stop condition instead of process signals.
///
/// # Errors
///
/// Returns a [`SupervisorError`] for fatal startup or serving failures.
pub async fn run_until(
    config: Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), SupervisorError> {
    let units = discovery::scan_units(&config.units.root, &config.units.extension)?;
    if units.is_empty() {
        warn!(
            root = %config.units.root.display(),
            "no units found, serving without services"
        );
    }

    let secure = config.secure();
    let descriptors: Vec<ServiceDescriptor> = units
        .iter()
        .map(|unit| ServiceDescriptor::new(unit.name.clone(), unit.path.clone(), secure))
        .collect();

    let table = Arc::new(DispatchTable::new(units));
    info!(services = ?table.service_paths(), "dispatch table ready");

    let executor: Arc<dyn UnitExecutor> = Arc::new(ProcessUnitExecutor::new(&config.runner));
    let mut network = NetworkModule::new(
        NetworkConfig::from_config(&config),
        Arc::clone(&table),
        executor,
    );

    // Bind first. The registry must only ever learn the port that is
    // actually listening, and a bind failure must exit before anything
    // has been created remotely.
    let port = network.start().await.map_err(SupervisorError::Bind)?;

    let provider = ProviderSystem {
        system_name: config.provider.system_name.clone(),
        address: config.provider.address.clone(),
        port,
        authentication_info: authentication_info(&config)?,
    };

    let registry = Arc::new(HttpRegistryClient::from_config(&config)?);
    let mut lifecycle = LifecycleManager::new(
        registry,
        provider,
        config.auto_setup.clone(),
        SystemId(config.provider.system_id),
        descriptors,
    );

    let report = lifecycle.start_up().await?;
    info!(
        system = %report.owning_system_id,
        services = report.services_registered,
        services_skipped = report.services_skipped,
        rules = report.rules_stored,
        "startup complete, serving"
    );

    let serve_result = network.serve(shutdown).await;

    // Teardown runs even when serving ended in an error; whatever was
    // registered must be removed either way.
    let teardown = lifecycle.tear_down().await;
    info!(
        removed = teardown.removed,
        failed = teardown.failed,
        "provider shut down"
    );

    serve_result.map_err(SupervisorError::Serve)
}

/// Provider certificate PEM advertised as the system's identity material.
fn authentication_info(config: &Config) -> Result<Option<String>, ClientBuildError> {
    let Some(identity) = &config.identity else {
        return Ok(None);
    };
    let pem = std::fs::read_to_string(&identity.cert_path).map_err(|source| {
        ClientBuildError::ReadIdentity {
            path: identity.cert_path.clone(),
            source,
        }
    })?;
    Ok(Some(pem))
}

/// Resolves when the process receives SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
