//! Domain Adapters
//!
//! Adapter implementations for the ledger ports, connecting domain
//! interfaces to the PostgreSQL database layer. Each adapter implements a
//! port trait, translates between domain models and row types, and uses the
//! repository layer for database access.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresUpdateStore, PostgresIncomingFileStore, PostgresSequenceGenerator};
//! use domain_update::UpdateLedger;
//! use std::sync::Arc;
//!
//! let ledger = UpdateLedger::new(
//!     Arc::new(PostgresUpdateStore::new(pool.clone())),
//!     Arc::new(PostgresSequenceGenerator::new(pool.clone())),
//!     Arc::new(PostgresIncomingFileStore::new(pool)),
//! );
//! ```

pub mod update;
pub mod incoming_file;
pub mod sequence;

pub use update::PostgresUpdateStore;
pub use incoming_file::PostgresIncomingFileStore;
pub use sequence::PostgresSequenceGenerator;
