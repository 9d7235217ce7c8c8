//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the update ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories own the SQL and
//! work on row types, adapters implement the `domain_update` ports on top of
//! them and convert `DatabaseError` into `PortError`.
//!
//! # Tables
//!
//! - `lx_update`: one row per update record, `sequence` stored as text
//! - `lx_file_incoming`: downloaded XML documents and their completion state
//! - `lx_sequence`: named counters backing `SequenceGenerator`
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/lx_replay")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresUpdateStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresUpdateStore, PostgresIncomingFileStore, PostgresSequenceGenerator};
