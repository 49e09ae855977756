//! Network configuration for the provider's HTTP surface.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Bind and timeout settings for the serving loop.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// TLS material; `None` serves plain HTTP.
    pub tls: Option<TlsConfig>,
    /// Maximum processing time for a single request.
    pub request_timeout: Duration,
    /// Maximum time to wait for in-flight requests after the stop signal.
    pub drain_timeout: Duration,
}

impl NetworkConfig {
    /// Derives the network settings from the server configuration.
    ///
    /// The provider binds all interfaces; `provider.address` is what gets
    /// advertised to the registry, not the bind address.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let tls = config.identity.as_ref().map(|identity| TlsConfig {
            cert_path: identity.cert_path.clone(),
            key_path: identity.key_path.clone(),
        });
        Self {
            host: "0.0.0.0".to_string(),
            port: config.provider.port,
            tls,
            request_timeout: Duration::from_secs(config.shutdown.request_timeout_secs),
            drain_timeout: Duration::from_secs(config.shutdown.drain_timeout_secs),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            tls: None,
            request_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// TLS certificate configuration.
///
/// No `Default` impl because certificate paths have no sensible defaults.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the provider certificate chain (PEM).
    pub cert_path: PathBuf,
    /// Path to the provider private key (PEM).
    pub key_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECURE: &str = r"
core:
  service-registry: { address: 127.0.0.1, port: 8443 }
  authorization:    { address: 127.0.0.1, port: 8445 }
  orchestrator:     { address: 127.0.0.1, port: 8441 }
provider:
  system-name: prototaip
  address: 192.168.1.20
  port: 8600
units:
  root: ./units
identity:
  cert-path: certs/provider.crt.pem
  key-path: certs/provider.key.pem
shutdown:
  drain-timeout-secs: 10
  request-timeout-secs: 20
";

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert!(config.tls.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.drain_timeout, Duration::from_secs(30));
    }

    #[test]
    fn from_config_maps_identity_and_timeouts() {
        let server_config = Config::from_yaml(SECURE).expect("config");
        let config = NetworkConfig::from_config(&server_config);

        assert_eq!(config.port, 8600);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.drain_timeout, Duration::from_secs(10));

        let tls = config.tls.expect("tls settings");
        assert_eq!(tls.cert_path, PathBuf::from("certs/provider.crt.pem"));
        assert_eq!(tls.key_path, PathBuf::from("certs/provider.key.pem"));
    }

    #[test]
    fn plain_config_has_no_tls() {
        let text = SECURE
            .lines()
            .filter(|line| !line.contains("identity") && !line.contains("-path"))
            .collect::<Vec<_>>()
            .join("\n");
        let server_config = Config::from_yaml(&text).expect("config");
        let config = NetworkConfig::from_config(&server_config);
        assert!(config.tls.is_none());
    }
}
