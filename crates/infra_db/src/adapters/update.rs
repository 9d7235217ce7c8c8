//! PostgreSQL Update Store Adapter
//!
//! Implements the ledger's `UpdateStore` port over `UpdateRepository`,
//! translating between rows and domain records.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresUpdateStore;
//! use domain_update::UpdateStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn UpdateStore> = Arc::new(PostgresUpdateStore::new(pool));
//! let update = store.get(update_id).await?;
//! ```

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    DomainPort, FileIncomingId, HealthCheckResult, HealthCheckable, PortError, UpdateId,
};
use domain_update::{Sequence, Update, UpdateChanges, UpdateQuery, UpdateState, UpdateStore};

use crate::error::DatabaseError;
use crate::repositories::update::{UpdateFilter, UpdateRepository, UpdateRow, UpdateRowChanges};

const ADAPTER_ID: &str = "postgres-update-store";

/// PostgreSQL-backed implementation of the `UpdateStore` port
///
/// Database errors are translated to `PortError` variants at this boundary.
/// A stored sequence that is not a non-negative integer fails the read.
#[derive(Debug, Clone)]
pub struct PostgresUpdateStore {
    repository: UpdateRepository,
}

impl PostgresUpdateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UpdateRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &UpdateRepository {
        &self.repository
    }
}

impl DomainPort for PostgresUpdateStore {}

#[async_trait]
impl HealthCheckable for PostgresUpdateStore {
    /// Performs a `SELECT 1` to verify the pool is operational
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.repository.pool())
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, latency_ms),
            Err(e) => {
                let message = format!("Database error: {}", e);
                HealthCheckResult::unhealthy(ADAPTER_ID, latency_ms, message)
            }
        }
    }
}

#[async_trait]
impl UpdateStore for PostgresUpdateStore {
    #[instrument(skip(self, update), fields(update_id = %update.id))]
    async fn insert(&self, update: Update) -> Result<Update, PortError> {
        let row = self.repository.insert(&update_to_row(&update)).await?;
        row_to_update(row).map_err(Into::into)
    }

    #[instrument(skip(self), fields(update_id = %id))]
    async fn get(&self, id: UpdateId) -> Result<Update, PortError> {
        let row = self.repository.get_by_id(id.into()).await?;
        row_to_update(row).map_err(Into::into)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_many(&self, ids: &[UpdateId]) -> Result<Vec<Update>, PortError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = self.repository.get_many(&ids).await?;
        rows_to_updates(rows)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &UpdateQuery) -> Result<Vec<Update>, PortError> {
        let filter = UpdateFilter {
            state: query.state.map(|s| s.as_str().to_string()),
            state_not: query.state_not.map(|s| s.as_str().to_string()),
            object_type: query.object_type.clone(),
            file_incoming_id: query.file_incoming_id.map(Uuid::from),
            limit: query.limit.map(i64::from),
            offset: query.offset.map(i64::from),
        };
        let rows = self.repository.search(&filter).await?;
        debug!(found = rows.len(), "Update search finished");
        rows_to_updates(rows)
    }

    #[instrument(skip(self, changes), fields(update_id = %id))]
    async fn write(&self, id: UpdateId, changes: &UpdateChanges) -> Result<Update, PortError> {
        let changes = UpdateRowChanges {
            file_incoming_id: changes.file_incoming_id.map(Uuid::from),
            data: changes.data.clone(),
            state: changes.state.map(|s| s.as_str().to_string()),
            result: changes.result.clone(),
        };
        let row = self.repository.write(id.into(), &changes).await?;
        row_to_update(row).map_err(Into::into)
    }

    #[instrument(skip(self), fields(update_id = %id))]
    async fn claim(
        &self,
        id: UpdateId,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, PortError> {
        Ok(self.repository.claim(id.into(), until, now).await?)
    }
}

fn update_to_row(update: &Update) -> UpdateRow {
    UpdateRow {
        id: update.id.into(),
        create_date: update.create_date,
        file_incoming_id: update.file_incoming_id.map(Uuid::from),
        sequence: update.sequence.to_string(),
        state: update.state.as_str().to_string(),
        object_type: update.object_type.clone(),
        data: update.data.clone(),
        result: update.result.clone(),
        node_number: update.node_number,
        claimed_until: update.claimed_until,
    }
}

fn row_to_update(row: UpdateRow) -> Result<Update, DatabaseError> {
    let sequence: Sequence = row
        .sequence
        .parse()
        .map_err(|_| DatabaseError::invalid_column("sequence", row.sequence.clone()))?;
    let state: UpdateState = row
        .state
        .parse()
        .map_err(|_| DatabaseError::invalid_column("state", row.state.clone()))?;

    Ok(Update {
        id: UpdateId::from_uuid(row.id),
        create_date: row.create_date,
        file_incoming_id: row.file_incoming_id.map(FileIncomingId::from_uuid),
        sequence,
        state,
        object_type: row.object_type,
        data: row.data,
        result: row.result,
        node_number: row.node_number,
        claimed_until: row.claimed_until,
    })
}

fn rows_to_updates(rows: Vec<UpdateRow>) -> Result<Vec<Update>, PortError> {
    rows.into_iter()
        .map(|row| row_to_update(row).map_err(PortError::from))
        .collect()
}
