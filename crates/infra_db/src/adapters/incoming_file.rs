//! PostgreSQL Incoming File Store Adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{DomainPort, FileIncomingId, PortError};
use domain_update::{IncomingFile, IncomingFileState, IncomingFileStore};

use crate::error::DatabaseError;
use crate::repositories::incoming_file::{IncomingFileRepository, IncomingFileRow};

/// PostgreSQL-backed implementation of the `IncomingFileStore` port
#[derive(Debug, Clone)]
pub struct PostgresIncomingFileStore {
    repository: IncomingFileRepository,
}

impl PostgresIncomingFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: IncomingFileRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresIncomingFileStore {}

#[async_trait]
impl IncomingFileStore for PostgresIncomingFileStore {
    #[instrument(skip(self, file), fields(file_incoming_id = %file.id))]
    async fn insert_file(&self, file: IncomingFile) -> Result<IncomingFile, PortError> {
        let row = IncomingFileRow {
            id: file.id.into(),
            xml_file_name: file.xml_file_name,
            state: file.state.as_str().to_string(),
            create_date: file.create_date,
        };
        let row = self.repository.insert(&row).await?;
        Ok(row_to_file(row)?)
    }

    #[instrument(skip(self), fields(file_incoming_id = %id))]
    async fn get_file(&self, id: FileIncomingId) -> Result<IncomingFile, PortError> {
        let row = self.repository.get_by_id(Uuid::from(id)).await?;
        Ok(row_to_file(row)?)
    }

    #[instrument(skip(self), fields(file_incoming_id = %id, state = state.as_str()))]
    async fn set_file_state(
        &self,
        id: FileIncomingId,
        state: IncomingFileState,
    ) -> Result<(), PortError> {
        Ok(self.repository.set_state(Uuid::from(id), state.as_str()).await?)
    }
}

fn row_to_file(row: IncomingFileRow) -> Result<IncomingFile, DatabaseError> {
    let state = IncomingFileState::parse(&row.state)
        .ok_or_else(|| DatabaseError::invalid_column("state", row.state.clone()))?;
    Ok(IncomingFile {
        id: FileIncomingId::from_uuid(row.id),
        xml_file_name: row.xml_file_name,
        state,
        create_date: row.create_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_row_to_file() {
        let row = IncomingFileRow {
            id: Uuid::now_v7(),
            xml_file_name: "INVENTAIRE_20240101.xml".to_string(),
            state: "done".to_string(),
            create_date: Utc::now(),
        };
        let file = row_to_file(row).unwrap();
        assert_eq!(file.state, IncomingFileState::Done);
    }

    #[test]
    fn test_unknown_file_state_fails_read() {
        let row = IncomingFileRow {
            id: Uuid::now_v7(),
            xml_file_name: "x.xml".to_string(),
            state: "archived".to_string(),
            create_date: Utc::now(),
        };
        assert!(row_to_file(row).is_err());
    }
}
