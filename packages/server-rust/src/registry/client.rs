//! HTTP implementation of the registry client.
//!
//! Talks to the service registry and authorization core systems over their
//! management endpoints. When the adapter runs secure, every call presents
//! the provider certificate as a client identity and verifies the core
//! systems against the configured CA bundle.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use unitdock_core::messages::{
    AuthorizationRuleForm, AuthorizationRuleResponse, ServiceRegistrationForm,
    ServiceRegistryEntry, SystemRegistryEntry,
};
use unitdock_core::types::{ProviderSystem, RuleId, ServiceId, SystemId};

use crate::config::Config;
use crate::registry::ops::{CoreSystem, ManagementOp};
use crate::traits::{RegistryClient, RegistryError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from constructing the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// Certificate or key file could not be read.
    #[error("cannot read identity material {path}: {source}")]
    ReadIdentity {
        /// The unreadable file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Certificate or key material was present but not usable.
    #[error("invalid identity material: {0}")]
    Identity(#[source] reqwest::Error),

    /// The underlying HTTP client rejected its configuration.
    #[error("cannot build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Management client backed by `reqwest`.
pub struct HttpRegistryClient {
    http: reqwest::Client,
    service_registry_base: String,
    authorization_base: String,
}

impl HttpRegistryClient {
    /// Builds a plain client against explicit base URLs.
    ///
    /// Used directly in tests; production construction goes through
    /// [`HttpRegistryClient::from_config`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError::Build`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        service_registry_base: String,
        authorization_base: String,
    ) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ClientBuildError::Build)?;
        Ok(Self {
            http,
            service_registry_base,
            authorization_base,
        })
    }

    /// Builds the client from the server configuration, loading the client
    /// identity and CA bundle when an identity section is present.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientBuildError`] when identity material cannot be read
    /// or the client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, ClientBuildError> {
        let secure = config.secure();
        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(identity) = &config.identity {
            let read = |path: &PathBuf| {
                std::fs::read(path).map_err(|source| ClientBuildError::ReadIdentity {
                    path: path.clone(),
                    source,
                })
            };

            // rustls wants key and certificate chain in one PEM blob.
            let mut pem = read(&identity.key_path)?;
            pem.extend_from_slice(&read(&identity.cert_path)?);
            let id = reqwest::Identity::from_pem(&pem).map_err(ClientBuildError::Identity)?;
            builder = builder.use_rustls_tls().identity(id);

            if let Some(ca_path) = &identity.ca_path {
                let bundle = read(ca_path)?;
                let certs = reqwest::Certificate::from_pem_bundle(&bundle)
                    .map_err(ClientBuildError::Identity)?;
                for cert in certs {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        let http = builder.build().map_err(ClientBuildError::Build)?;
        Ok(Self {
            http,
            service_registry_base: config.core.service_registry.base_url(secure),
            authorization_base: config.core.authorization.base_url(secure),
        })
    }

    fn base_for(&self, op: ManagementOp) -> &str {
        match op.core_system() {
            CoreSystem::ServiceRegistry => &self.service_registry_base,
            CoreSystem::Authorization => &self.authorization_base,
        }
    }

    fn url(&self, op: ManagementOp) -> String {
        format!("{}/{}", self.base_for(op), op.path())
    }

    fn removal_url(&self, op: ManagementOp, id: i64) -> String {
        format!("{}/{}/{id}", self.base_for(op), op.path())
    }

    async fn post_json<B, T>(&self, op: ManagementOp, body: &B) -> Result<T, RegistryError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(op);
        debug!(%op, %url, "management call");

        let response = self
            .http
            .request(op.method(), &url)
            .json(body)
            .send()
            .await
            .map_err(|source| RegistryError::Transport { op, source })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| RegistryError::Transport { op, source })?;

        if !status.is_success() {
            return Err(RegistryError::Status {
                op,
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|source| RegistryError::Decode { op, source })
    }

    async fn delete(&self, op: ManagementOp, id: i64) -> Result<(), RegistryError> {
        let url = self.removal_url(op, id);
        debug!(%op, %url, "management call");

        let response = self
            .http
            .request(op.method(), &url)
            .send()
            .await
            .map_err(|source| RegistryError::Transport { op, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                op,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn register_system(&self, system: &ProviderSystem) -> Result<SystemId, RegistryError> {
        let entry: SystemRegistryEntry =
            self.post_json(ManagementOp::RegisterSystem, system).await?;
        Ok(entry.id)
    }

    async fn unregister_system(&self, id: SystemId) -> Result<(), RegistryError> {
        self.delete(ManagementOp::RemoveSystem, id.0).await
    }

    async fn register_service(
        &self,
        form: &ServiceRegistrationForm,
    ) -> Result<ServiceId, RegistryError> {
        let entry: ServiceRegistryEntry =
            self.post_json(ManagementOp::RegisterService, form).await?;
        Ok(entry.service_definition.id)
    }

    async fn unregister_service(&self, id: ServiceId) -> Result<(), RegistryError> {
        self.delete(ManagementOp::RemoveService, id.0).await
    }

    async fn store_authorization_rule(
        &self,
        form: &AuthorizationRuleForm,
    ) -> Result<RuleId, RegistryError> {
        let response: AuthorizationRuleResponse = self
            .post_json(ManagementOp::StoreAuthorizationRule, form)
            .await?;
        Ok(response.count)
    }

    async fn remove_authorization_rule(&self, id: RuleId) -> Result<(), RegistryError> {
        self.delete(ManagementOp::RemoveAuthorizationRule, id.0).await
    }
}
