//! Server configuration loaded from a YAML file.
//!
//! The file uses kebab-case keys. Sections `core`, `provider`, and `units`
//! are required; everything else has defaults chosen for a development
//! deployment (no TLS, no automatic registration).

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors from reading, parsing, or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Path passed on the command line.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML or misses required sections.
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// `provider.system-name` is empty.
    #[error("provider.system-name must not be empty")]
    MissingSystemName,

    /// `units.root` is empty.
    #[error("units.root must not be empty")]
    MissingUnitsRoot,

    /// `runner.command` is empty.
    #[error("runner.command must not be empty")]
    MissingRunnerCommand,

    /// Authorization rules are enabled with no consumers to authorize.
    #[error("auto-setup.authorization-rules is enabled but auto-setup.consumers is empty")]
    NoConsumers,
}

/// Top-level configuration for the adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Addresses of the core systems in the local cloud.
    pub core: CoreSystems,
    /// Identity and bind settings of this provider.
    pub provider: ProviderConfig,
    /// Where unit files live and how they are recognized.
    pub units: UnitsConfig,
    /// Which registration steps run automatically at startup.
    #[serde(default)]
    pub auto_setup: AutoSetupConfig,
    /// TLS identity material. When present the provider serves HTTPS and
    /// presents this identity as a client certificate on registry calls.
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
    /// Command that executes a unit.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Request and drain timeouts.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    /// Log output settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Network locations of the three core systems.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoreSystems {
    /// Service registry core system.
    pub service_registry: CoreEndpoint,
    /// Authorization core system.
    pub authorization: CoreEndpoint,
    /// Orchestrator core system.
    pub orchestrator: CoreEndpoint,
}

/// Address and port of one core system.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoreEndpoint {
    /// Host name or IP address.
    pub address: String,
    /// TCP port.
    pub port: u16,
}

impl CoreEndpoint {
    /// Base URL for management calls against this core system.
    #[must_use]
    pub fn base_url(&self, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.address, self.port)
    }
}

/// Identity of this provider inside the local cloud.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProviderConfig {
    /// System name registered with the service registry.
    pub system_name: String,
    /// Address the provider advertises to the cloud.
    pub address: String,
    /// Port the provider binds and advertises. 0 means OS-assigned.
    pub port: u16,
    /// Preassigned system id, used when `auto-setup.register-system` is off
    /// because the system record is administered externally.
    #[serde(default)]
    pub system_id: i64,
}

/// Location and file pattern of executable units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnitsConfig {
    /// Directory scanned recursively for unit files.
    pub root: PathBuf,
    /// File extension (without dot) that marks a unit file.
    #[serde(default = "default_unit_extension")]
    pub extension: String,
}

fn default_unit_extension() -> String {
    "ipynb".to_string()
}

/// Gates for the automatic registration steps.
///
/// Service registration depends on the system id, and authorization rules
/// reference registered service ids, so the gates cascade: disabling an
/// earlier step makes later steps use preconfigured or empty inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AutoSetupConfig {
    /// Register (and later remove) the owning system.
    #[serde(default)]
    pub register_system: bool,
    /// Register (and later remove) each discovered unit as a service.
    #[serde(default)]
    pub register_services: bool,
    /// Store (and later remove) one authorization rule per consumer.
    #[serde(default)]
    pub authorization_rules: bool,
    /// Registry ids of the consumer systems to authorize.
    #[serde(default)]
    pub consumers: Vec<i64>,
}

/// PEM certificate material for TLS serving and client-certificate registry calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IdentityConfig {
    /// Provider certificate chain (PEM).
    pub cert_path: PathBuf,
    /// Provider private key (PEM).
    pub key_path: PathBuf,
    /// CA bundle used to verify the core systems. When absent the system
    /// trust store is used.
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
}

/// Command template that runs one unit.
///
/// `{unit}` in an argument is replaced with the unit's source path; when no
/// argument contains the placeholder the path is appended as the final
/// argument.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Executable to spawn per request.
    pub command: String,
    /// Arguments passed to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock limit for one execution.
    #[serde(default = "default_runner_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_runner_timeout_secs() -> u64 {
    60
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["{unit}".to_string()],
            timeout_secs: default_runner_timeout_secs(),
        }
    }
}

/// Timeouts applied while serving and while shutting down.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight requests after the stop signal.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    /// Maximum processing time for a single request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_drain_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: default_drain_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogConfig {
    /// Also write log output to a timestamped file under `path`.
    #[serde(default)]
    pub to_file: bool,
    /// Directory for log files, created if missing.
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./logs")
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            to_file: false,
            path: default_log_path(),
        }
    }
}

impl Config {
    /// Reads and validates the configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read, is not valid
    /// YAML, or violates a validation rule.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parses and validates configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when parsing or validation fails.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether the provider serves TLS and authenticates registry calls
    /// with a client certificate.
    #[must_use]
    pub fn secure(&self) -> bool {
        self.identity.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.system_name.trim().is_empty() {
            return Err(ConfigError::MissingSystemName);
        }
        if self.units.root.as_os_str().is_empty() {
            return Err(ConfigError::MissingUnitsRoot);
        }
        if self.runner.command.trim().is_empty() {
            return Err(ConfigError::MissingRunnerCommand);
        }
        if self.auto_setup.authorization_rules && self.auto_setup.consumers.is_empty() {
            return Err(ConfigError::NoConsumers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r"
core:
  service-registry: { address: 127.0.0.1, port: 8443 }
  authorization:    { address: 127.0.0.1, port: 8445 }
  orchestrator:     { address: 127.0.0.1, port: 8441 }
provider:
  system-name: prototaip
  address: 192.168.1.20
  port: 8600
  system-id: 12
units:
  root: ./notebooks
  extension: ipynb
auto-setup:
  register-system: true
  register-services: true
  authorization-rules: true
  consumers: [5, 9]
identity:
  cert-path: certs/provider.crt.pem
  key-path: certs/provider.key.pem
  ca-path: certs/sysop.ca
runner:
  command: python3
  args: ['{unit}']
  timeout-secs: 45
shutdown:
  drain-timeout-secs: 10
  request-timeout-secs: 20
log:
  to-file: true
  path: ./logs
";

    const MINIMAL: &str = r"
core:
  service-registry: { address: 127.0.0.1, port: 8443 }
  authorization:    { address: 127.0.0.1, port: 8445 }
  orchestrator:     { address: 127.0.0.1, port: 8441 }
provider:
  system-name: dev
  address: 127.0.0.1
  port: 0
units:
  root: ./units
";

    #[test]
    fn full_config_parses() {
        let config = Config::from_yaml(FULL).expect("full config should parse");

        assert_eq!(config.provider.system_name, "prototaip");
        assert_eq!(config.provider.system_id, 12);
        assert_eq!(config.core.authorization.port, 8445);
        assert_eq!(config.auto_setup.consumers, vec![5, 9]);
        assert_eq!(config.runner.timeout_secs, 45);
        assert_eq!(config.shutdown.drain_timeout_secs, 10);
        assert!(config.log.to_file);
        assert!(config.secure());
    }

    #[test]
    fn minimal_config_applies_defaults() {
        let config = Config::from_yaml(MINIMAL).expect("minimal config should parse");

        assert_eq!(config.units.extension, "ipynb");
        assert!(!config.auto_setup.register_system);
        assert!(!config.auto_setup.register_services);
        assert!(!config.auto_setup.authorization_rules);
        assert!(config.auto_setup.consumers.is_empty());
        assert_eq!(config.provider.system_id, 0);
        assert_eq!(config.runner.command, "python3");
        assert_eq!(config.runner.args, vec!["{unit}"]);
        assert_eq!(config.shutdown.drain_timeout_secs, 30);
        assert_eq!(config.shutdown.request_timeout_secs, 30);
        assert!(!config.log.to_file);
        assert!(!config.secure());
    }

    #[test]
    fn base_url_picks_scheme() {
        let endpoint = CoreEndpoint {
            address: "10.0.0.2".into(),
            port: 8443,
        };
        assert_eq!(endpoint.base_url(true), "https://10.0.0.2:8443");
        assert_eq!(endpoint.base_url(false), "http://10.0.0.2:8443");
    }

    #[test]
    fn empty_system_name_is_rejected() {
        let text = MINIMAL.replace("system-name: dev", "system-name: '  '");
        let err = Config::from_yaml(&text).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSystemName));
    }

    #[test]
    fn auth_rules_without_consumers_are_rejected() {
        let text = format!("{MINIMAL}auto-setup:\n  authorization-rules: true\n");
        let err = Config::from_yaml(&text).unwrap_err();
        assert!(matches!(err, ConfigError::NoConsumers));
    }

    #[test]
    fn missing_required_section_is_a_parse_error() {
        let err = Config::from_yaml("units:\n  root: ./u\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
