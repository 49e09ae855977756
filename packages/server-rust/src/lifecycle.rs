//! Provider lifecycle against the core systems.
//!
//! The manager walks the startup sequence (system, services, authorization
//! rules) through an abstract [`RegistryClient`] and records every id the
//! registry hands back. Teardown replays the record in reverse. Only
//! resources the manager created are ever removed; a preconfigured system
//! id is used but never unregistered.

use std::sync::Arc;

use tracing::{debug, info, warn};

use unitdock_core::messages::{AuthorizationRuleForm, ServiceRegistrationForm};
use unitdock_core::types::{
    ProviderSystem, RuleId, ServiceDescriptor, ServiceId, SystemId, DEFAULT_INTERFACE_ID,
};

use crate::config::AutoSetupConfig;
use crate::traits::{RegistryClient, RegistryError};

// ---------------------------------------------------------------------------
// LifecyclePhase
// ---------------------------------------------------------------------------

/// Where the provider is in its lifecycle.
///
/// Gated steps that are disabled in the configuration still advance the
/// phase; the phase tracks progress through the sequence, not which calls
/// were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    SystemRegistered,
    ServicesRegistered,
    AuthProvisioned,
    Serving,
}

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Ids of the resources this provider created in the core systems.
///
/// An id is pushed only after the creating call succeeded, and drained when
/// its removal succeeds. Entries that fail to remove stay behind for
/// post-mortem inspection.
#[derive(Debug, Default)]
pub struct LifecycleState {
    /// System id assigned at registration. `None` when the system record is
    /// administered externally.
    pub system_id: Option<SystemId>,
    /// Service ids in registration order.
    pub service_ids: Vec<ServiceId>,
    /// Authorization rule handles in store order.
    pub auth_rule_ids: Vec<RuleId>,
}

// ---------------------------------------------------------------------------
// Reports and errors
// ---------------------------------------------------------------------------

/// Outcome counts of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    /// System id under which services and rules were provisioned.
    pub owning_system_id: SystemId,
    pub services_registered: usize,
    pub services_skipped: usize,
    pub rules_stored: usize,
    pub rules_skipped: usize,
}

/// Outcome counts of teardown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub removed: usize,
    pub failed: usize,
}

/// Fatal startup errors.
///
/// Only system registration is fatal; failed service registrations and
/// authorization rules are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The mandatory system registration failed. Nothing was created.
    #[error("system registration failed: {0}")]
    SystemRegistration(#[source] RegistryError),
}

// ---------------------------------------------------------------------------
// LifecycleManager
// ---------------------------------------------------------------------------

/// Drives registration at startup and removal at shutdown.
///
/// `start_up` and `tear_down` are sequential await chains; the manager is
/// driven from one supervisor task and holds no locks.
pub struct LifecycleManager {
    registry: Arc<dyn RegistryClient>,
    provider: ProviderSystem,
    auto_setup: AutoSetupConfig,
    preconfigured_system_id: SystemId,
    descriptors: Vec<ServiceDescriptor>,
    phase: LifecyclePhase,
    state: LifecycleState,
    torn_down: bool,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        provider: ProviderSystem,
        auto_setup: AutoSetupConfig,
        preconfigured_system_id: SystemId,
        descriptors: Vec<ServiceDescriptor>,
    ) -> Self {
        Self {
            registry,
            provider,
            auto_setup,
            preconfigured_system_id,
            descriptors,
            phase: LifecyclePhase::Uninitialized,
            state: LifecycleState::default(),
            torn_down: false,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Ids recorded so far.
    #[must_use]
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Runs the startup sequence: system registration, service registration,
    /// authorization provisioning. Call once, before serving.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::SystemRegistration`] when the mandatory
    /// system registration fails. Later steps never fail the startup; their
    /// failures are logged and counted in the report.
    pub async fn start_up(&mut self) -> Result<StartupReport, StartupError> {
        let owning_system_id = self.register_system_step().await?;
        let (services_registered, services_skipped) = self.register_services_step().await;
        let (rules_stored, rules_skipped) = self.provision_rules_step(owning_system_id).await;
        self.phase = LifecyclePhase::Serving;

        Ok(StartupReport {
            owning_system_id,
            services_registered,
            services_skipped,
            rules_stored,
            rules_skipped,
        })
    }

    async fn register_system_step(&mut self) -> Result<SystemId, StartupError> {
        let registry = Arc::clone(&self.registry);
        let id = if self.auto_setup.register_system {
            let id = registry
                .register_system(&self.provider)
                .await
                .map_err(StartupError::SystemRegistration)?;
            info!(system = %self.provider.system_name, %id, "system registered");
            self.state.system_id = Some(id);
            id
        } else {
            debug!(
                id = %self.preconfigured_system_id,
                "system registration disabled, using preconfigured id"
            );
            self.preconfigured_system_id
        };
        self.phase = LifecyclePhase::SystemRegistered;
        Ok(id)
    }

    async fn register_services_step(&mut self) -> (usize, usize) {
        let registry = Arc::clone(&self.registry);
        let mut registered = 0;
        let mut skipped = 0;

        if self.auto_setup.register_services {
            let planned: Vec<&str> = self
                .descriptors
                .iter()
                .map(|d| d.service_uri.as_str())
                .collect();
            info!(count = planned.len(), services = ?planned, "registering services");

            for index in 0..self.descriptors.len() {
                let form = ServiceRegistrationForm::new(&self.provider, &self.descriptors[index]);
                match registry.register_service(&form).await {
                    Ok(id) => {
                        debug!(service = %form.service_definition, %id, "service registered");
                        self.state.service_ids.push(id);
                        registered += 1;
                    }
                    Err(error) => {
                        warn!(
                            service = %form.service_definition,
                            %error,
                            "service registration failed, unit stays local only"
                        );
                        skipped += 1;
                    }
                }
            }
        } else {
            debug!("service registration disabled");
        }

        self.phase = LifecyclePhase::ServicesRegistered;
        (registered, skipped)
    }

    async fn provision_rules_step(&mut self, owning_system_id: SystemId) -> (usize, usize) {
        let registry = Arc::clone(&self.registry);
        let mut stored = 0;
        let mut skipped = 0;

        // Rules reference the service ids from the previous step, so the
        // gate requires service registration to have been enabled too.
        let enabled = self.auto_setup.authorization_rules && self.auto_setup.register_services;
        if enabled && self.state.service_ids.is_empty() {
            warn!("no services registered, skipping authorization rules");
        } else if enabled {
            for &consumer in &self.auto_setup.consumers {
                let form = AuthorizationRuleForm {
                    consumer_id: SystemId(consumer),
                    provider_ids: vec![owning_system_id],
                    interface_ids: vec![DEFAULT_INTERFACE_ID],
                    service_definition_ids: self.state.service_ids.clone(),
                };
                match registry.store_authorization_rule(&form).await {
                    Ok(rule) => {
                        debug!(consumer, %rule, "authorization rule stored");
                        self.state.auth_rule_ids.push(rule);
                        stored += 1;
                    }
                    Err(error) => {
                        warn!(consumer, %error, "authorization rule store failed");
                        skipped += 1;
                    }
                }
            }
            if stored == 0 && skipped > 0 {
                warn!("all authorization rule stores failed");
            }
        } else {
            debug!("authorization provisioning disabled");
        }

        self.phase = LifecyclePhase::AuthProvisioned;
        (stored, skipped)
    }

    /// Removes everything recorded in the state, inverse to creation order:
    /// authorization rules, then services, then the system. Each resource
    /// gets exactly one removal attempt; failures are logged and counted but
    /// never block later removals. A second call is a no-op.
    pub async fn tear_down(&mut self) -> TeardownReport {
        if self.torn_down {
            return TeardownReport::default();
        }
        self.torn_down = true;

        let registry = Arc::clone(&self.registry);
        let mut report = TeardownReport::default();

        let rules = std::mem::take(&mut self.state.auth_rule_ids);
        for rule in rules {
            match registry.remove_authorization_rule(rule).await {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    warn!(%rule, %error, "authorization rule removal failed");
                    self.state.auth_rule_ids.push(rule);
                    report.failed += 1;
                }
            }
        }

        let services = std::mem::take(&mut self.state.service_ids);
        for service in services {
            match registry.unregister_service(service).await {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    warn!(%service, %error, "service removal failed");
                    self.state.service_ids.push(service);
                    report.failed += 1;
                }
            }
        }

        if let Some(system) = self.state.system_id.take() {
            match registry.unregister_system(system).await {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    warn!(%system, %error, "system removal failed");
                    self.state.system_id = Some(system);
                    report.failed += 1;
                }
            }
        }

        info!(
            removed = report.removed,
            failed = report.failed,
            "teardown finished"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
