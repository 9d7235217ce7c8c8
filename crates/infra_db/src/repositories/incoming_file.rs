//! Incoming file repository implementation

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Column list for `lx_file_incoming` queries
const FILE_COLUMNS: &str = "id, xml_file_name, state, create_date";

/// A row from the `lx_file_incoming` table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct IncomingFileRow {
    pub id: Uuid,
    pub xml_file_name: String,
    pub state: String,
    pub create_date: DateTime<Utc>,
}

/// Repository for incoming file aggregates
#[derive(Debug, Clone)]
pub struct IncomingFileRepository {
    pool: PgPool,
}

impl IncomingFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &IncomingFileRow) -> Result<IncomingFileRow, DatabaseError> {
        let query = format!(
            "INSERT INTO lx_file_incoming ({FILE_COLUMNS}) VALUES ($1, $2, $3, $4) \
             RETURNING {FILE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, IncomingFileRow>(&query)
            .bind(row.id)
            .bind(&row.xml_file_name)
            .bind(&row.state)
            .bind(row.create_date)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<IncomingFileRow, DatabaseError> {
        let query = format!("SELECT {FILE_COLUMNS} FROM lx_file_incoming WHERE id = $1");
        sqlx::query_as::<_, IncomingFileRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("IncomingFile", id))
    }

    pub async fn set_state(&self, id: Uuid, state: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE lx_file_incoming SET state = $2 WHERE id = $1")
            .bind(id)
            .bind(state)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("IncomingFile", id));
        }
        Ok(())
    }
}
