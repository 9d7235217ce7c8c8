//! Replay Engine
//!
//! Executes update records in ascending numeric sequence order. Each record
//! is handled in isolation: a failing record is marked `Failed` with its
//! diagnostic and the batch moves on. Only ledger and storage errors abort
//! a batch.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use core_kernel::{OperationMetadata, UpdateId};
use domain_update::{IncomingFilePort, Sequence, Update, UpdateLedger, UpdateQuery};

use crate::error::ReplayError;
use crate::handler::HandlerContext;
use crate::registry::{self, HandlerRegistry};

/// Prefix of the diagnostic stored on a failed record
pub const FAILURE_PREFIX: &str = "Error while executing: ";

/// Engine settings
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// How long a claim keeps other invocations away from a record
    pub claim_lease: Duration,
    /// Recorded in the handler context metadata
    pub initiated_by: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            claim_lease: Duration::seconds(300),
            initiated_by: "replay-engine".to_string(),
        }
    }
}

impl ReplayConfig {
    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    pub fn initiated_by(mut self, who: impl Into<String>) -> Self {
        self.initiated_by = who.into();
        self
    }
}

/// What happened to one record during a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Executed,
    Failed { result: String },
    /// Already executed when the engine reached it
    SkippedExecuted,
    /// Another invocation holds a live claim on it
    SkippedClaimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub update_id: UpdateId,
    pub sequence: Sequence,
    pub object_type: String,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

/// Outcome of one `execute` call, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub records: Vec<RecordReport>,
}

impl ReplaySummary {
    fn ids_where(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> Vec<UpdateId> {
        self.records
            .iter()
            .filter(|r| predicate(&r.outcome))
            .map(|r| r.update_id)
            .collect()
    }

    pub fn executed(&self) -> Vec<UpdateId> {
        self.ids_where(|o| matches!(o, RecordOutcome::Executed))
    }

    pub fn failed(&self) -> Vec<UpdateId> {
        self.ids_where(|o| matches!(o, RecordOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> Vec<UpdateId> {
        self.ids_where(|o| {
            matches!(o, RecordOutcome::SkippedExecuted | RecordOutcome::SkippedClaimed)
        })
    }

    /// Sequences in the order the engine visited them
    pub fn sequences(&self) -> Vec<Sequence> {
        self.records.iter().map(|r| r.sequence).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ordered, fault-tolerant dispatcher of update records
#[derive(Clone)]
pub struct ReplayEngine {
    ledger: UpdateLedger,
    registry: Arc<HandlerRegistry>,
    files: Arc<dyn IncomingFilePort>,
    config: ReplayConfig,
}

impl ReplayEngine {
    pub fn new(
        ledger: UpdateLedger,
        registry: Arc<HandlerRegistry>,
        files: Arc<dyn IncomingFilePort>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            ledger,
            registry,
            files,
            config,
        }
    }

    /// Builds an engine on the process-wide registry
    ///
    /// # Errors
    ///
    /// `ReplayError::RegistryNotInstalled` if `install_global` was never called
    pub fn from_global(
        ledger: UpdateLedger,
        files: Arc<dyn IncomingFilePort>,
        config: ReplayConfig,
    ) -> Result<Self, ReplayError> {
        let registry = registry::global().ok_or(ReplayError::RegistryNotInstalled)?;
        Ok(Self::new(ledger, registry, files, config))
    }

    pub fn ledger(&self) -> &UpdateLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Executes the given records in ascending sequence order
    ///
    /// Duplicate ids are executed once. Missing ids fail the whole call
    /// before any handler runs.
    ///
    /// # Errors
    ///
    /// Ledger and storage errors. Per-record failures are stored on the
    /// record and reported in the summary instead.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn execute(&self, ids: &[UpdateId]) -> Result<ReplaySummary, ReplayError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<UpdateId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut records = self.ledger.get_many(&unique).await?;
        records.sort_by_key(Update::replay_key);

        let mut summary = ReplaySummary::default();
        for record in &records {
            let report = self.execute_one(record.id).await?;
            summary.records.push(report);
        }

        info!(
            executed = summary.executed().len(),
            failed = summary.failed().len(),
            skipped = summary.skipped().len(),
            "Replay batch finished"
        );
        Ok(summary)
    }

    /// Executes every record that is not executed yet
    #[instrument(skip(self))]
    pub async fn execute_all(&self) -> Result<ReplaySummary, ReplayError> {
        let pending = self.ledger.search(&UpdateQuery::pending()).await?;
        let ids: Vec<UpdateId> = pending.iter().map(|u| u.id).collect();
        debug!(pending = ids.len(), "Replaying pending updates");
        self.execute(&ids).await
    }

    async fn execute_one(&self, id: UpdateId) -> Result<RecordReport, ReplayError> {
        // Re-fetch: an earlier record of the batch may have touched this one
        let update = self.ledger.get(id).await?;
        let report = |outcome| RecordReport {
            update_id: update.id,
            sequence: update.sequence,
            object_type: update.object_type.clone(),
            outcome,
        };

        if update.is_executed() {
            debug!(update_id = %id, "Skipping executed update");
            return Ok(report(RecordOutcome::SkippedExecuted));
        }

        if !self.ledger.claim(id, self.config.claim_lease).await? {
            debug!(update_id = %id, "Update is claimed by another invocation");
            return Ok(report(RecordOutcome::SkippedClaimed));
        }

        let outcome = match self.run_handler(&update).await {
            Ok(applied) => {
                if !applied {
                    debug!(
                        update_id = %id,
                        object_type = %update.object_type,
                        "Handler had nothing to apply"
                    );
                }
                self.ledger.mark_executed(id).await?;
                self.notify_file(&update).await;
                debug!(update_id = %id, sequence = %update.sequence, "Update executed");
                RecordOutcome::Executed
            }
            Err(error) if error.is_record_failure() => {
                let result = format!("{}{}", FAILURE_PREFIX, error);
                warn!(
                    update_id = %id,
                    sequence = %update.sequence,
                    error = %error,
                    "Update failed"
                );
                self.ledger.mark_failed(id, result.clone()).await?;
                RecordOutcome::Failed { result }
            }
            Err(error) => return Err(error),
        };

        Ok(report(outcome))
    }

    async fn run_handler(&self, update: &Update) -> Result<bool, ReplayError> {
        let payload = update
            .payload()
            .map_err(|e| ReplayError::Deserialization(e.to_string()))?;
        let factory = self.registry.resolve(&update.object_type)?.clone();

        let metadata = OperationMetadata::with_correlation_id(update.id.to_string())
            .initiated_by(self.config.initiated_by.clone());
        let context = HandlerContext::for_update(update, metadata);

        // Build and run on its own task so a panic fails only this record
        let task = tokio::spawn(async move {
            let handler = factory(&payload).map_err(ReplayError::from)?;
            handler.process(&context, &payload).await.map_err(ReplayError::from)
        });
        match task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                let panic = join_error.into_panic();
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ReplayError::HandlerExecution(format!("handler panicked: {}", message)))
            }
            Err(join_error) => Err(ReplayError::HandlerExecution(join_error.to_string())),
        }
    }

    async fn notify_file(&self, update: &Update) {
        let Some(file_id) = update.file_incoming_id else {
            return;
        };
        match self.files.check_still_waiting(file_id).await {
            Ok(state) => debug!(
                file_incoming_id = %file_id,
                state = state.as_str(),
                "Incoming file checked"
            ),
            Err(error) => warn!(
                update_id = %update.id,
                file_incoming_id = %file_id,
                error = %error,
                "Could not re-evaluate incoming file"
            ),
        }
    }
}
