//! PostgreSQL Sequence Generator Adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{DomainPort, PortError};
use domain_update::{Sequence, SequenceGenerator};

use crate::repositories::sequence::SequenceRepository;

/// Draws sequence numbers from the `lx_sequence` table
#[derive(Debug, Clone)]
pub struct PostgresSequenceGenerator {
    repository: SequenceRepository,
}

impl PostgresSequenceGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SequenceRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresSequenceGenerator {}

#[async_trait]
impl SequenceGenerator for PostgresSequenceGenerator {
    #[instrument(skip(self))]
    async fn next(&self, scope: &str) -> Result<Sequence, PortError> {
        let value = self.repository.next_value(scope).await?;
        u64::try_from(value)
            .map(Sequence::new)
            .map_err(|_| {
                PortError::transformation(format!(
                    "negative sequence value {} in scope {}",
                    value, scope
                ))
            })
    }
}
