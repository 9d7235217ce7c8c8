//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! update ledger and replay engine test suites.
//!
//! # Modules
//!
//! - `fixtures`: sample payloads, files and an in-memory ledger harness
//! - `builders`: builder for update records with sensible defaults
//! - `handlers`: recording and failing object-type handlers
//! - `database`: PostgreSQL testcontainer with the migrations applied
//! - `assertions`: assertion helpers for update records
//! - `generators`: property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod handlers;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use handlers::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
