//! Named sequence counters
//!
//! Each scope is one row of `lx_sequence`. Drawing a value is a single
//! upsert, so concurrent callers never receive the same number.

use sqlx::PgPool;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: PgPool,
}

impl SequenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the next value of `scope`, starting at 1
    pub async fn next_value(&self, scope: &str) -> Result<i64, DatabaseError> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO lx_sequence (scope, next_value) VALUES ($1, 2) \
             ON CONFLICT (scope) DO UPDATE SET next_value = lx_sequence.next_value + 1 \
             RETURNING next_value - 1",
        )
        .bind(scope)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}
