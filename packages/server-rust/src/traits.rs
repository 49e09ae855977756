use async_trait::async_trait;
use unitdock_core::messages::{AuthorizationRuleForm, ServiceRegistrationForm};
use unitdock_core::types::{ProviderSystem, RuleId, ServiceId, SystemId};

use crate::registry::ops::ManagementOp;

/// Errors from one management call against a core system.
///
/// Every variant names the operation so partial-failure logs identify what
/// was being attempted without extra context.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The request never produced an HTTP response.
    #[error("transport failure during {op}: {source}")]
    Transport {
        /// Operation being performed.
        op: ManagementOp,
        #[source]
        source: reqwest::Error,
    },

    /// The core system answered with a non-success status.
    #[error("{op} rejected with status {status}: {body}")]
    Status {
        /// Operation being performed.
        op: ManagementOp,
        /// HTTP status code of the rejection.
        status: u16,
        /// Response body, for the log only.
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("cannot decode {op} response: {source}")]
    Decode {
        /// Operation being performed.
        op: ManagementOp,
        #[source]
        source: serde_json::Error,
    },
}

/// Management access to the local cloud's registry and authorization systems.
///
/// The lifecycle manager drives all six calls; implementations decide the
/// transport. The production implementation speaks HTTPS with a client
/// certificate; tests substitute a recording fake.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Registers the owning system and returns its registry id.
    async fn register_system(&self, system: &ProviderSystem) -> Result<SystemId, RegistryError>;

    /// Removes a previously registered system.
    async fn unregister_system(&self, id: SystemId) -> Result<(), RegistryError>;

    /// Registers one provided service and returns its service definition id.
    async fn register_service(
        &self,
        form: &ServiceRegistrationForm,
    ) -> Result<ServiceId, RegistryError>;

    /// Removes a previously registered service.
    async fn unregister_service(&self, id: ServiceId) -> Result<(), RegistryError>;

    /// Stores one intracloud authorization rule and returns its handle.
    async fn store_authorization_rule(
        &self,
        form: &AuthorizationRuleForm,
    ) -> Result<RuleId, RegistryError>;

    /// Removes a previously stored authorization rule.
    async fn remove_authorization_rule(&self, id: RuleId) -> Result<(), RegistryError>;
}
