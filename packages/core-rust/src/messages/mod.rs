//! Wire forms for the registry management protocol.
//!
//! Each struct maps to a JSON body accepted or returned by the management
//! endpoints of the core systems (service registry and authorization). All
//! types use `#[serde(rename_all = "camelCase")]` to match the wire format
//! those endpoints expect.

pub mod management;

pub use management::{
    AuthorizationRuleForm, AuthorizationRuleResponse, ServiceDefinitionRef,
    ServiceRegistrationForm, ServiceRegistryEntry, SystemRegistryEntry,
};
