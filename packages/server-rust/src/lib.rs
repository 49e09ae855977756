//! Unitdock Server — serves a directory of executable units as registered,
//! authorized services in an Arrowhead local cloud.

pub mod config;
pub mod discovery;
pub mod executor;
pub mod lifecycle;
pub mod network;
pub mod registry;
pub mod supervisor;
pub mod traits;

pub use config::{Config, ConfigError};
pub use discovery::{DispatchTable, UnitEntry};
pub use lifecycle::{LifecycleManager, LifecyclePhase};
pub use supervisor::SupervisorError;
pub use traits::{RegistryClient, RegistryError};
