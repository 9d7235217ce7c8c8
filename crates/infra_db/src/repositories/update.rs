//! Update repository implementation
//!
//! Database access for the `lx_update` table. Rows carry the raw column
//! values; mapping to domain types happens in the adapter.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Column list for `lx_update` queries
const UPDATE_COLUMNS: &str = "\
    id, create_date, file_incoming_id, sequence, state, \
    object_type, data, result, node_number, claimed_until";

/// Replay order: numeric sequence, then creation
///
/// Malformed sequences sort first so they surface immediately when read.
const REPLAY_ORDER: &str = "\
    CASE WHEN btrim(sequence) ~ '^[0-9]+$' THEN btrim(sequence)::numeric END NULLS FIRST, \
    create_date, id";

/// A row from the `lx_update` table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UpdateRow {
    pub id: Uuid,
    pub create_date: DateTime<Utc>,
    pub file_incoming_id: Option<Uuid>,
    pub sequence: String,
    pub state: String,
    pub object_type: String,
    pub data: String,
    pub result: String,
    pub node_number: i32,
    pub claimed_until: Option<DateTime<Utc>>,
}

/// Filters for `UpdateRepository::search`
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    pub state: Option<String>,
    pub state_not: Option<String>,
    pub object_type: Option<String>,
    pub file_incoming_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Column changes for `UpdateRepository::write`; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdateRowChanges {
    pub file_incoming_id: Option<Uuid>,
    pub data: Option<String>,
    pub state: Option<String>,
    pub result: Option<String>,
}

/// Repository for update records
#[derive(Debug, Clone)]
pub struct UpdateRepository {
    pool: PgPool,
}

impl UpdateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert(&self, row: &UpdateRow) -> Result<UpdateRow, DatabaseError> {
        let query = format!(
            "INSERT INTO lx_update ({UPDATE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {UPDATE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, UpdateRow>(&query)
            .bind(row.id)
            .bind(row.create_date)
            .bind(row.file_incoming_id)
            .bind(&row.sequence)
            .bind(&row.state)
            .bind(&row.object_type)
            .bind(&row.data)
            .bind(&row.result)
            .bind(row.node_number)
            .bind(row.claimed_until)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    /// Retrieves an update by its identifier
    pub async fn get_by_id(&self, id: Uuid) -> Result<UpdateRow, DatabaseError> {
        let query = format!("SELECT {UPDATE_COLUMNS} FROM lx_update WHERE id = $1");
        sqlx::query_as::<_, UpdateRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Update", id))
    }

    /// Retrieves the updates among `ids` that exist
    pub async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<UpdateRow>, DatabaseError> {
        let query = format!("SELECT {UPDATE_COLUMNS} FROM lx_update WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, UpdateRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Finds updates matching the filter, in replay order
    pub async fn search(&self, filter: &UpdateFilter) -> Result<Vec<UpdateRow>, DatabaseError> {
        let query = format!(
            "SELECT {UPDATE_COLUMNS} FROM lx_update \
             WHERE ($1::text IS NULL OR state = $1) \
               AND ($2::text IS NULL OR state <> $2) \
               AND ($3::text IS NULL OR object_type = $3) \
               AND ($4::uuid IS NULL OR file_incoming_id = $4) \
             ORDER BY {REPLAY_ORDER} \
             LIMIT $5 OFFSET COALESCE($6, 0)"
        );
        let rows = sqlx::query_as::<_, UpdateRow>(&query)
            .bind(filter.state.as_deref())
            .bind(filter.state_not.as_deref())
            .bind(filter.object_type.as_deref())
            .bind(filter.file_incoming_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Applies column changes; a state change releases the claim
    pub async fn write(
        &self,
        id: Uuid,
        changes: &UpdateRowChanges,
    ) -> Result<UpdateRow, DatabaseError> {
        let query = format!(
            "UPDATE lx_update SET \
                file_incoming_id = COALESCE($2, file_incoming_id), \
                data = COALESCE($3, data), \
                state = COALESCE($4, state), \
                result = COALESCE($5, result), \
                claimed_until = CASE WHEN $4::text IS NULL THEN claimed_until ELSE NULL END \
             WHERE id = $1 \
             RETURNING {UPDATE_COLUMNS}"
        );
        sqlx::query_as::<_, UpdateRow>(&query)
            .bind(id)
            .bind(changes.file_incoming_id)
            .bind(changes.data.as_deref())
            .bind(changes.state.as_deref())
            .bind(changes.result.as_deref())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Update", id))
    }

    /// Sets `claimed_until` when the record is not executed and not claimed at `now`
    ///
    /// Returns false when the claim is refused.
    pub async fn claim(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let claimed: Option<Uuid> = sqlx::query_scalar(
            "UPDATE lx_update SET claimed_until = $2 \
             WHERE id = $1 \
               AND state <> 'executed' \
               AND (claimed_until IS NULL OR claimed_until <= $3) \
             RETURNING id",
        )
        .bind(id)
        .bind(until)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if claimed.is_some() {
            return Ok(true);
        }
        if !self.exists(id).await? {
            return Err(DatabaseError::not_found("Update", id));
        }
        Ok(false)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lx_update WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
