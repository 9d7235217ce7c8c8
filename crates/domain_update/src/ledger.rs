//! Update ledger service
//!
//! The single write path for update records. It normalizes values, draws
//! execution sequences and refuses deletion.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, warn};

use core_kernel::{PortError, UpdateId};

use crate::error::UpdateError;
use crate::ports::{IncomingFileStore, SequenceGenerator, UpdateQuery, UpdateStore};
use crate::update::{Update, UpdateState, UPDATE_SEQUENCE_SCOPE};
use crate::values::UpdateValues;

/// Audit-safe ledger of update records
#[derive(Clone)]
pub struct UpdateLedger {
    store: Arc<dyn UpdateStore>,
    sequences: Arc<dyn SequenceGenerator>,
    files: Arc<dyn IncomingFileStore>,
}

impl UpdateLedger {
    pub fn new(
        store: Arc<dyn UpdateStore>,
        sequences: Arc<dyn SequenceGenerator>,
        files: Arc<dyn IncomingFileStore>,
    ) -> Self {
        Self { store, sequences, files }
    }

    /// Returns the underlying store
    pub fn store(&self) -> &Arc<dyn UpdateStore> {
        &self.store
    }

    /// Returns the incoming file store
    pub fn files(&self) -> &Arc<dyn IncomingFileStore> {
        &self.files
    }

    /// Creates a new update record
    ///
    /// `object_type`, `data` and `node_number` are required. Unless a sequence
    /// is given explicitly, one is drawn from the `lx.update` series.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` when a required field is absent, or a storage
    /// error from the adapters.
    #[instrument(skip(self, values))]
    pub async fn create(&self, values: UpdateValues) -> Result<Update, UpdateError> {
        let values = values.sanitize()?;

        let object_type = values
            .object_type
            .clone()
            .ok_or(UpdateError::MissingField("object_type"))?;
        let data = values
            .data_text()
            .map(str::to_string)
            .ok_or(UpdateError::MissingField("data"))?;
        let node_number = values.node_number.ok_or(UpdateError::MissingField("node_number"))?;

        let sequence = match values.sequence {
            Some(sequence) => sequence,
            None => self.sequences.next(UPDATE_SEQUENCE_SCOPE).await?,
        };

        let update = Update {
            id: UpdateId::new_v7(),
            create_date: Utc::now(),
            file_incoming_id: values.file_incoming_id,
            sequence,
            state: values.state.unwrap_or_default(),
            object_type,
            data,
            result: values.result.unwrap_or_default(),
            node_number,
            claimed_until: None,
        };

        let created = self.store.insert(update).await?;
        debug!(
            update_id = %created.id,
            sequence = %created.sequence,
            object_type = %created.object_type,
            "Update created"
        );
        Ok(created)
    }

    /// Applies a partial change to one record
    ///
    /// # Errors
    ///
    /// `NotFound` if the record does not exist, `ReadOnlyField` when the
    /// values touch `sequence`, `object_type` or `node_number`.
    #[instrument(skip(self, values), fields(update_id = %id))]
    pub async fn update(&self, id: UpdateId, values: UpdateValues) -> Result<Update, UpdateError> {
        let changes = values.sanitize()?.into_changes()?;
        Ok(self.store.write(id, &changes).await?)
    }

    /// Applies the same change to several records
    pub async fn update_many(
        &self,
        ids: &[UpdateId],
        values: UpdateValues,
    ) -> Result<Vec<Update>, UpdateError> {
        let changes = values.sanitize()?.into_changes()?;
        let mut written = Vec::with_capacity(ids.len());
        for id in ids {
            written.push(self.store.write(*id, &changes).await?);
        }
        Ok(written)
    }

    /// Deleting update records is disabled
    pub async fn delete(&self, ids: &[UpdateId]) -> Result<(), UpdateError> {
        warn!(count = ids.len(), "Refusing to delete update records");
        Err(UpdateError::ProtectedRecord { count: ids.len() })
    }

    pub async fn get(&self, id: UpdateId) -> Result<Update, UpdateError> {
        Ok(self.store.get(id).await?)
    }

    /// Retrieves every requested record, failing on the first missing id
    pub async fn get_many(&self, ids: &[UpdateId]) -> Result<Vec<Update>, UpdateError> {
        let found = self.store.get_many(ids).await?;
        if found.len() != ids.len() {
            if let Some(missing) = ids.iter().find(|id| !found.iter().any(|u| u.id == **id)) {
                return Err(UpdateError::not_found(missing));
            }
        }
        Ok(found)
    }

    pub async fn search(&self, query: &UpdateQuery) -> Result<Vec<Update>, UpdateError> {
        Ok(self.store.search(query).await?)
    }

    /// Composes `"<xml file name>, Node <node number>"` for a record
    pub async fn display_name(&self, id: UpdateId) -> Result<String, UpdateError> {
        let update = self.store.get(id).await?;
        self.display_name_of(&update).await
    }

    /// Same as `display_name` for a record already at hand
    pub async fn display_name_of(&self, update: &Update) -> Result<String, UpdateError> {
        let file_name = match update.file_incoming_id {
            Some(file_id) => match self.files.get_file(file_id).await {
                Ok(file) => Some(file.xml_file_name),
                Err(PortError::NotFound { .. }) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        Ok(update.display_name(file_name.as_deref()))
    }

    /// Claims a record for execution for the given lease
    pub async fn claim(&self, id: UpdateId, lease: Duration) -> Result<bool, UpdateError> {
        let now = Utc::now();
        self.claim_at(id, now + lease, now).await
    }

    pub async fn claim_at(
        &self,
        id: UpdateId,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, UpdateError> {
        Ok(self.store.claim(id, until, now).await?)
    }

    /// Marks a record executed; the result is cleared by sanitization
    pub async fn mark_executed(&self, id: UpdateId) -> Result<Update, UpdateError> {
        self.update(id, UpdateValues::new().state(UpdateState::Executed)).await
    }

    /// Marks a record failed with a diagnostic
    pub async fn mark_failed(
        &self,
        id: UpdateId,
        result: impl Into<String>,
    ) -> Result<Update, UpdateError> {
        self.update(id, UpdateValues::new().state(UpdateState::Failed).result(result)).await
    }
}
