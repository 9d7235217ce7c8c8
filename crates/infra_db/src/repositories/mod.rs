//! Repository implementations for ledger tables
//!
//! Repositories encapsulate SQL queries and map between database rows and
//! plain column values. Queries are built at runtime with bound parameters,
//! so the crate compiles without a live database.

pub mod update;
pub mod incoming_file;
pub mod sequence;

pub use update::{UpdateRepository, UpdateRow, UpdateFilter, UpdateRowChanges};
pub use incoming_file::{IncomingFileRepository, IncomingFileRow};
pub use sequence::SequenceRepository;
