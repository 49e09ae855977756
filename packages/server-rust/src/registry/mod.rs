//! Registry management: the operation glossary and the HTTP client.

pub mod client;
pub mod ops;

pub use client::{ClientBuildError, HttpRegistryClient};
pub use ops::{CoreSystem, ManagementOp};
