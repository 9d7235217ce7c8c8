//! Update Ledger Ports
//!
//! Persistence interfaces the ledger and the replay engine depend on. The
//! PostgreSQL adapters live in `infra_db`; in-memory adapters for tests are
//! available behind the `mock` feature.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_update::{UpdateLedger, FileCompletionTracker};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn UpdateStore> = Arc::new(PostgresUpdateStore::new(pool.clone()));
//! let files: Arc<dyn IncomingFileStore> = Arc::new(PostgresIncomingFileStore::new(pool.clone()));
//! let sequences: Arc<dyn SequenceGenerator> = Arc::new(PostgresSequenceGenerator::new(pool));
//!
//! let ledger = UpdateLedger::new(store, sequences, files);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{DomainPort, FileIncomingId, HealthCheckable, PortError, UpdateId};

use crate::incoming::{IncomingFile, IncomingFileState};
use crate::update::{Sequence, Update, UpdateState};
use crate::values::UpdateChanges;

/// Query parameters for finding updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateQuery {
    /// Only updates in this state
    pub state: Option<UpdateState>,
    /// Only updates not in this state
    pub state_not: Option<UpdateState>,
    /// Filter by object type
    pub object_type: Option<String>,
    /// Filter by parent file
    pub file_incoming_id: Option<FileIncomingId>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl UpdateQuery {
    /// Every update that still has to be (re)played
    pub fn pending() -> Self {
        Self {
            state_not: Some(UpdateState::Executed),
            ..Default::default()
        }
    }

    /// Every update produced by the given file
    pub fn for_file(file_incoming_id: FileIncomingId) -> Self {
        Self {
            file_incoming_id: Some(file_incoming_id),
            ..Default::default()
        }
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Returns true if the update satisfies every filter of the query
    pub fn matches(&self, update: &Update) -> bool {
        if let Some(state) = self.state {
            if update.state != state {
                return false;
            }
        }
        if let Some(state) = self.state_not {
            if update.state == state {
                return false;
            }
        }
        if let Some(ref object_type) = self.object_type {
            if &update.object_type != object_type {
                return false;
            }
        }
        if let Some(file_id) = self.file_incoming_id {
            if update.file_incoming_id != Some(file_id) {
                return false;
            }
        }
        true
    }
}

/// Persistence port for update records
///
/// Implementations store exactly what they are given; normalization happens
/// in `UpdateLedger` before any call reaches the store. There is no delete.
#[async_trait]
pub trait UpdateStore: DomainPort + HealthCheckable {
    /// Persists a new record
    async fn insert(&self, update: Update) -> Result<Update, PortError>;

    /// Retrieves a record, or `PortError::NotFound`
    async fn get(&self, id: UpdateId) -> Result<Update, PortError>;

    /// Retrieves several records; missing ids are left out of the result
    async fn get_many(&self, ids: &[UpdateId]) -> Result<Vec<Update>, PortError>;

    /// Finds records matching the query, in replay order
    async fn search(&self, query: &UpdateQuery) -> Result<Vec<Update>, PortError>;

    /// Applies changes to a record and returns it
    ///
    /// Writing `state` also releases any claim on the record.
    async fn write(&self, id: UpdateId, changes: &UpdateChanges) -> Result<Update, PortError>;

    /// Claims a record for execution until `until`
    ///
    /// Compare-and-set: succeeds only when the record is not executed and has
    /// no claim that is still live at `now`. Returns false when the claim is
    /// refused.
    async fn claim(
        &self,
        id: UpdateId,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, PortError>;
}

/// Source of monotonically increasing sequence numbers, one series per scope
#[async_trait]
pub trait SequenceGenerator: DomainPort {
    async fn next(&self, scope: &str) -> Result<Sequence, PortError>;
}

/// Persistence port for incoming file aggregates
#[async_trait]
pub trait IncomingFileStore: DomainPort {
    async fn insert_file(&self, file: IncomingFile) -> Result<IncomingFile, PortError>;

    /// Retrieves a file, or `PortError::NotFound`
    async fn get_file(&self, id: FileIncomingId) -> Result<IncomingFile, PortError>;

    async fn set_file_state(
        &self,
        id: FileIncomingId,
        state: IncomingFileState,
    ) -> Result<(), PortError>;
}

/// Notification target called after each successfully executed update
#[async_trait]
pub trait IncomingFilePort: Send + Sync {
    /// Re-evaluates whether the file still waits on any of its updates
    async fn check_still_waiting(
        &self,
        file_incoming_id: FileIncomingId,
    ) -> Result<IncomingFileState, PortError>;
}

/// In-memory implementations of the ledger ports
///
/// These adapters keep everything in process memory and are meant for unit
/// and API tests.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory update store
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryUpdateStore {
        updates: Arc<RwLock<HashMap<UpdateId, Update>>>,
    }

    impl InMemoryUpdateStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Overwrites a record as-is, bypassing the ledger
        ///
        /// Tests use this to simulate collaborators changing a record behind
        /// the engine's back.
        pub async fn put(&self, update: Update) {
            self.updates.write().await.insert(update.id, update);
        }

        pub async fn len(&self) -> usize {
            self.updates.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.updates.read().await.is_empty()
        }
    }

    impl DomainPort for InMemoryUpdateStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryUpdateStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("memory-update-store", 0)
        }
    }

    #[async_trait]
    impl UpdateStore for InMemoryUpdateStore {
        async fn insert(&self, update: Update) -> Result<Update, PortError> {
            let mut updates = self.updates.write().await;
            if updates.contains_key(&update.id) {
                return Err(PortError::conflict(format!("update {} already exists", update.id)));
            }
            updates.insert(update.id, update.clone());
            Ok(update)
        }

        async fn get(&self, id: UpdateId) -> Result<Update, PortError> {
            self.updates
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Update", id))
        }

        async fn get_many(&self, ids: &[UpdateId]) -> Result<Vec<Update>, PortError> {
            let updates = self.updates.read().await;
            Ok(ids.iter().filter_map(|id| updates.get(id).cloned()).collect())
        }

        async fn search(&self, query: &UpdateQuery) -> Result<Vec<Update>, PortError> {
            let updates = self.updates.read().await;
            let mut results: Vec<_> = updates
                .values()
                .filter(|u| query.matches(u))
                .cloned()
                .collect();
            results.sort_by_key(Update::replay_key);

            // Apply pagination
            if let Some(offset) = query.offset {
                results = results.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = query.limit {
                results.truncate(limit as usize);
            }

            Ok(results)
        }

        async fn write(&self, id: UpdateId, changes: &UpdateChanges) -> Result<Update, PortError> {
            let mut updates = self.updates.write().await;
            let update = updates
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Update", id))?;

            if let Some(file_id) = changes.file_incoming_id {
                update.file_incoming_id = Some(file_id);
            }
            if let Some(ref data) = changes.data {
                update.data = data.clone();
            }
            if let Some(state) = changes.state {
                update.state = state;
                update.claimed_until = None;
            }
            if let Some(ref result) = changes.result {
                update.result = result.clone();
            }

            Ok(update.clone())
        }

        async fn claim(
            &self,
            id: UpdateId,
            until: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> Result<bool, PortError> {
            let mut updates = self.updates.write().await;
            let update = updates
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Update", id))?;

            if !update.is_claimable_at(now) {
                return Ok(false);
            }
            update.claimed_until = Some(until);
            Ok(true)
        }
    }

    /// In-memory sequence generator, starting every scope at 1
    #[derive(Debug, Default)]
    pub struct InMemorySequenceGenerator {
        next: Mutex<HashMap<String, u64>>,
    }

    impl InMemorySequenceGenerator {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for InMemorySequenceGenerator {}

    #[async_trait]
    impl SequenceGenerator for InMemorySequenceGenerator {
        async fn next(&self, scope: &str) -> Result<Sequence, PortError> {
            let mut next = self
                .next
                .lock()
                .map_err(|_| PortError::internal("sequence generator lock poisoned"))?;
            let counter = next.entry(scope.to_string()).or_insert(1);
            let value = *counter;
            *counter += 1;
            Ok(Sequence::new(value))
        }
    }

    /// In-memory incoming file store
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryIncomingFileStore {
        files: Arc<RwLock<HashMap<FileIncomingId, IncomingFile>>>,
    }

    impl InMemoryIncomingFileStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for InMemoryIncomingFileStore {}

    #[async_trait]
    impl IncomingFileStore for InMemoryIncomingFileStore {
        async fn insert_file(&self, file: IncomingFile) -> Result<IncomingFile, PortError> {
            self.files.write().await.insert(file.id, file.clone());
            Ok(file)
        }

        async fn get_file(&self, id: FileIncomingId) -> Result<IncomingFile, PortError> {
            self.files
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("IncomingFile", id))
        }

        async fn set_file_state(
            &self,
            id: FileIncomingId,
            state: IncomingFileState,
        ) -> Result<(), PortError> {
            let mut files = self.files.write().await;
            let file = files
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("IncomingFile", id))?;
            file.state = state;
            Ok(())
        }
    }
}
