use std::fmt;

use serde::{Deserialize, Serialize};

/// Interface descriptor advertised for services provided over TLS.
pub const INTERFACE_SECURE: &str = "HTTP-SECURE-JSON";

/// Interface descriptor advertised for services provided over plain HTTP.
pub const INTERFACE_INSECURE: &str = "HTTP-INSECURE-JSON";

/// Access policy under which services are registered. Consumers authenticate
/// with client certificates; no token exchange is involved.
pub const ACCESS_POLICY_CERTIFICATE: &str = "CERTIFICATE";

/// Interface id referenced by authorization rules. The registry assigns id 1
/// to the first interface of a registered service, which is the only one this
/// adapter ever registers.
pub const DEFAULT_INTERFACE_ID: i64 = 1;

/// Registry-assigned identifier of a provider system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub i64);

/// Registry-assigned identifier of a registered service definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub i64);

/// Identifier of a stored intracloud authorization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub i64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the provider system as the registry sees it.
///
/// Serializes to the `camelCase` JSON shape the registry management endpoints
/// expect, so this struct is embedded directly in registration forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSystem {
    /// Name under which the system is registered.
    pub system_name: String,

    /// Address where the provider is reachable from inside the cloud.
    pub address: String,

    /// Port the provider serves on.
    pub port: u16,

    /// PEM-encoded public key material, present when the provider
    /// authenticates with a client certificate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub authentication_info: Option<String>,
}

/// A single provided service as it will be advertised to the registry.
///
/// `service_definition` and `service_uri` are derived from a discovered unit
/// by the naming rules in [`crate::naming`]; interface and access policy are
/// fixed per deployment (secure vs insecure serving).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service definition name, unique per unit.
    pub service_definition: String,

    /// URI path (relative, no leading slash) the service is served under.
    pub service_uri: String,

    /// Interface descriptor, one of [`INTERFACE_SECURE`] / [`INTERFACE_INSECURE`].
    pub interface: String,

    /// Access policy, currently always [`ACCESS_POLICY_CERTIFICATE`].
    pub access_policy: String,
}

impl ServiceDescriptor {
    /// Builds a descriptor for a derived (name, path) pair.
    #[must_use]
    pub fn new(service_definition: String, service_uri: String, secure: bool) -> Self {
        let interface = if secure {
            INTERFACE_SECURE
        } else {
            INTERFACE_INSECURE
        };
        Self {
            service_definition,
            service_uri,
            interface: interface.to_string(),
            access_policy: ACCESS_POLICY_CERTIFICATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_newtypes_serialize_transparently() {
        let id = ServiceId(42);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!(42));

        let back: ServiceId = serde_json::from_value(serde_json::json!(42)).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn provider_system_serializes_camel_case() {
        let system = ProviderSystem {
            system_name: "prototaip".into(),
            address: "127.0.0.1".into(),
            port: 8443,
            authentication_info: Some("PUBKEY".into()),
        };

        let json = serde_json::to_value(&system).unwrap();
        assert_eq!(json["systemName"], "prototaip");
        assert_eq!(json["address"], "127.0.0.1");
        assert_eq!(json["port"], 8443);
        assert_eq!(json["authenticationInfo"], "PUBKEY");
    }

    #[test]
    fn provider_system_omits_missing_authentication_info() {
        let system = ProviderSystem {
            system_name: "plain".into(),
            address: "10.0.0.5".into(),
            port: 8080,
            authentication_info: None,
        };

        let json = serde_json::to_value(&system).unwrap();
        assert!(json.get("authenticationInfo").is_none());
    }

    #[test]
    fn descriptor_picks_interface_from_security() {
        let secure = ServiceDescriptor::new("echo".into(), "nb/echo".into(), true);
        assert_eq!(secure.interface, INTERFACE_SECURE);
        assert_eq!(secure.access_policy, ACCESS_POLICY_CERTIFICATE);

        let insecure = ServiceDescriptor::new("echo".into(), "nb/echo".into(), false);
        assert_eq!(insecure.interface, INTERFACE_INSECURE);
    }
}
