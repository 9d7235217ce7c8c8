//! Update Ledger Domain
//!
//! Every node of an XML document downloaded from LX1 becomes one `Update`
//! record. Records are replayed later in the order of their execution
//! sequence, and they are never deleted: the ledger is the audit trail of
//! everything the connector received and what happened when it was applied.
//!
//! # Update Lifecycle
//!
//! ```text
//! to_execute -> executed
//!     |            ^
//!     v            |
//!   failed --------+   (failed records are retried on every replay)
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use domain_update::{UpdateLedger, UpdateValues};
//! use serde_json::json;
//!
//! let update = ledger
//!     .create(
//!         UpdateValues::new()
//!             .object_type("FOUR")
//!             .structured(json!({"NUM_BL": "IN/00042"}))
//!             .node_number(1),
//!     )
//!     .await?;
//! assert!(update.data.contains("    \"NUM_BL\""));
//! ```

pub mod update;
pub mod values;
pub mod incoming;
pub mod ledger;
pub mod ports;
pub mod error;

pub use update::{Update, UpdateState, Sequence, UPDATE_SEQUENCE_SCOPE};
pub use values::{UpdateValues, UpdateData, UpdateChanges, to_canonical_json};
pub use incoming::{IncomingFile, IncomingFileState, FileCompletionTracker};
pub use ledger::UpdateLedger;
pub use ports::{
    UpdateStore, SequenceGenerator, IncomingFileStore, IncomingFilePort, UpdateQuery,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemoryUpdateStore, InMemorySequenceGenerator, InMemoryIncomingFileStore};
pub use error::UpdateError;
