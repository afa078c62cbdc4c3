//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the reconciliation core and an
//! external system (processes, filesystem, container registry).
//! Implementations live in `src/adapters/`.

pub mod commands;
pub mod filesystem;
pub mod registry;

pub use commands::{CommandOutput, CommandRunner};
pub use filesystem::FileSystem;
pub use registry::{RegistryClient, RegistryFuture};

/// Error type shared by all ports.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;
