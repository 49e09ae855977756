//! Unitdock Core — domain types, deterministic service naming, and the
//! registry management wire forms shared by the server and tooling.

pub mod messages;
pub mod naming;
pub mod traits;
pub mod types;

pub use naming::{derive_service_name, derive_service_path};
pub use traits::{ExecutionError, UnitExecutor};
pub use types::{ProviderSystem, RuleId, ServiceDescriptor, ServiceId, SystemId};
