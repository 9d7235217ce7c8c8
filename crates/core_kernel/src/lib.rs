//! Core Kernel - Foundational types for the LX1 update connector
//!
//! This crate provides the building blocks shared by the ledger, the replay
//! engine and the adapters:
//! - Strongly-typed identifiers for updates and incoming files
//! - The kernel error type
//! - Port infrastructure (port errors, health checks, operation metadata)

pub mod identifiers;
pub mod error;
pub mod ports;

pub use identifiers::{UpdateId, FileIncomingId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    OperationMetadata,
};
