//! Replay Engine Domain
//!
//! Applies update records from the ledger through object-type handlers, in
//! execution-sequence order, recording the outcome on every record.
//!
//! # Replay Flow
//!
//! ```text
//! ids -> load sequences -> sort numerically -> for each record:
//!     re-fetch -> skip if executed -> claim -> deserialize data
//!     -> resolve handler by object_type -> process
//!     -> executed (notify incoming file) | failed (store diagnostic)
//! ```
//!
//! A failing record never stops the batch. Failed records stay eligible and
//! are attempted again by the next `execute_all`.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_replay::{HandlerRegistry, ReplayEngine, ReplayConfig};
//!
//! let registry = HandlerRegistry::builder()
//!     .register_typed("FOUR", |order: PurchaseOrderReception| ReceivePurchaseOrder::new(order, stock.clone()))
//!     .build()?;
//!
//! let engine = ReplayEngine::new(ledger, Arc::new(registry), tracker, ReplayConfig::default());
//! let summary = engine.execute_all().await?;
//! ```

pub mod handler;
pub mod registry;
pub mod engine;
pub mod error;

pub use handler::{ObjectTypeHandler, HandlerContext, HandlerError, HandlerFactory};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder, install_global, global};
pub use engine::{ReplayEngine, ReplayConfig, ReplaySummary, RecordReport, RecordOutcome};
pub use error::ReplayError;
