//! Unitdock provider binary.
//!
//! Loads the YAML configuration, sets up logging, and hands control to the
//! supervisor, which owns the rest of the process lifetime. Exit codes:
//! 0 for a clean signal-driven shutdown, 127 when the mandatory system
//! registration fails, 1 for any other fatal error.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use unitdock_server::config::Config;
use unitdock_server::supervisor;

/// Serves a directory of executable units as registered, authorized services
/// in an Arrowhead local cloud.
#[derive(Parser, Debug)]
#[command(name = "unitdock")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "unitdock.yaml", env = "UNITDOCK_CONFIG")]
    config: PathBuf,

    /// Lower the default log level to debug (RUST_LOG still overrides)
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_path(&args.config) {
        Ok(config) => config,
        Err(error) => {
            // Log routing is part of the configuration, so a config error
            // can only go to stderr.
            eprintln!("unitdock: {error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = init_tracing(&config, args.debug) {
        eprintln!("unitdock: cannot initialize logging: {error}");
        std::process::exit(1);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "unitdock starting"
    );

    if let Err(error) = supervisor::run(config).await {
        error!(%error, "fatal error");
        std::process::exit(error.exit_code());
    }
}

/// Installs the tracing subscriber: stdout always, plus a timestamped file
/// under `log.path` when `log.to-file` is enabled.
fn init_tracing(config: &Config, debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = if config.log.to_file {
        std::fs::create_dir_all(&config.log.path)?;
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log.path.join(format!("unitdock-{stamp}.log")))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}
