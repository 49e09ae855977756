//! Management request and response bodies for system, service, and
//! authorization-rule administration.
//!
//! The registry's management endpoints are JSON over HTTPS with `camelCase`
//! field names. Response structs model only the fields this adapter reads;
//! unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

use crate::types::{ProviderSystem, RuleId, ServiceDescriptor, ServiceId, SystemId};

// ---------------------------------------------------------------------------
// Registration forms
// ---------------------------------------------------------------------------

/// Body for registering one provided service with the service registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistrationForm {
    /// Service definition name derived from the unit file.
    pub service_definition: String,

    /// The providing system, embedded in full so the registry can create
    /// the system record on first sight.
    pub provider_system: ProviderSystem,

    /// Relative URI the service is reachable under on the provider.
    pub service_uri: String,

    /// Access policy for the service (`CERTIFICATE`).
    pub secure: String,

    /// Interface descriptors; this adapter always registers exactly one.
    pub interfaces: Vec<String>,

    /// Service definition version, when the deployment pins one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<i64>,
}

impl ServiceRegistrationForm {
    /// Builds the registration body for one descriptor provided by `system`.
    #[must_use]
    pub fn new(system: &ProviderSystem, descriptor: &ServiceDescriptor) -> Self {
        Self {
            service_definition: descriptor.service_definition.clone(),
            provider_system: system.clone(),
            service_uri: descriptor.service_uri.clone(),
            secure: descriptor.access_policy.clone(),
            interfaces: vec![descriptor.interface.clone()],
            version: None,
        }
    }
}

/// Body for storing one intracloud authorization rule.
///
/// One rule covers a single consumer and every service definition named in
/// `service_definition_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRuleForm {
    /// Registry id of the consumer system being authorized.
    pub consumer_id: SystemId,

    /// Registry ids of the providing systems (always exactly the owning
    /// system of this adapter).
    pub provider_ids: Vec<SystemId>,

    /// Interface ids the rule applies to.
    pub interface_ids: Vec<i64>,

    /// Service definition ids the consumer is granted access to.
    pub service_definition_ids: Vec<ServiceId>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response body from registering a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRegistryEntry {
    /// Registry-assigned system id. This is the id recorded for teardown.
    pub id: SystemId,

    /// Echo of the registered system name.
    pub system_name: String,
}

/// The service definition portion of a service registration response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinitionRef {
    /// Registry-assigned service definition id. This is the id recorded for
    /// teardown and referenced by authorization rules.
    pub id: ServiceId,

    /// Echo of the service definition name.
    pub service_definition: String,
}

/// Response body from registering a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegistryEntry {
    /// Registry entry id of the registration record itself.
    pub id: i64,

    /// The service definition this registration was filed under.
    pub service_definition: ServiceDefinitionRef,
}

/// Response body from storing an authorization rule.
///
/// The authorization system replies with a `count` field, which the
/// management protocol treats as the handle for later removal of the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRuleResponse {
    /// Stored-rule handle used for `DELETE` on the intracloud endpoint.
    pub count: RuleId,
}
