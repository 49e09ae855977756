//! Glossary of the management operations this adapter performs.
//!
//! Each operation maps to one (method, core system, path) triple. The HTTP
//! client consults this table instead of spelling URLs per call site, and
//! errors carry the operation for log context.

use std::fmt;

use reqwest::Method;

/// Core system that serves a management operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreSystem {
    /// The service registry.
    ServiceRegistry,
    /// The authorization system.
    Authorization,
}

/// A symbolic management call against a core system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagementOp {
    /// Create the owning system record.
    RegisterSystem,
    /// Delete the owning system record.
    RemoveSystem,
    /// Create one service registration.
    RegisterService,
    /// Delete one service registration.
    RemoveService,
    /// Store one intracloud authorization rule.
    StoreAuthorizationRule,
    /// Delete one intracloud authorization rule.
    RemoveAuthorizationRule,
}

impl ManagementOp {
    /// Which core system serves this operation.
    #[must_use]
    pub fn core_system(self) -> CoreSystem {
        match self {
            Self::RegisterSystem
            | Self::RemoveSystem
            | Self::RegisterService
            | Self::RemoveService => CoreSystem::ServiceRegistry,
            Self::StoreAuthorizationRule | Self::RemoveAuthorizationRule => {
                CoreSystem::Authorization
            }
        }
    }

    /// HTTP method of the operation.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::RegisterSystem | Self::RegisterService | Self::StoreAuthorizationRule => {
                Method::POST
            }
            Self::RemoveSystem | Self::RemoveService | Self::RemoveAuthorizationRule => {
                Method::DELETE
            }
        }
    }

    /// Endpoint path relative to the core system's base URL.
    ///
    /// Removal operations append `/{id}` to this path.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::RegisterSystem | Self::RemoveSystem => "serviceregistry/mgmt/systems",
            Self::RegisterService | Self::RemoveService => "serviceregistry/mgmt",
            Self::StoreAuthorizationRule | Self::RemoveAuthorizationRule => {
                "authorization/mgmt/intracloud"
            }
        }
    }

    /// Stable name used in logs and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegisterSystem => "register-system",
            Self::RemoveSystem => "remove-system",
            Self::RegisterService => "register-service",
            Self::RemoveService => "remove-service",
            Self::StoreAuthorizationRule => "store-authorization-rule",
            Self::RemoveAuthorizationRule => "remove-authorization-rule",
        }
    }
}

impl fmt::Display for ManagementOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
