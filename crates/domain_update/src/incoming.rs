//! Incoming file aggregate
//!
//! An incoming file is one XML document downloaded from LX1. It owns the
//! updates parsed from its nodes and is done once all of them executed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{FileIncomingId, PortError};

use crate::ports::{IncomingFilePort, IncomingFileStore, UpdateQuery, UpdateStore};
use crate::update::{Update, UpdateState};

/// Completion state of an incoming file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingFileState {
    /// At least one update has not executed yet
    #[default]
    Waiting,
    /// Every update of the file executed
    Done,
}

impl IncomingFileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomingFileState::Waiting => "waiting",
            IncomingFileState::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(IncomingFileState::Waiting),
            "done" => Some(IncomingFileState::Done),
            _ => None,
        }
    }
}

/// One downloaded XML document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingFile {
    pub id: FileIncomingId,
    pub xml_file_name: String,
    pub state: IncomingFileState,
    pub create_date: DateTime<Utc>,
}

impl IncomingFile {
    pub fn new(xml_file_name: impl Into<String>) -> Self {
        Self {
            id: FileIncomingId::new_v7(),
            xml_file_name: xml_file_name.into(),
            state: IncomingFileState::Waiting,
            create_date: Utc::now(),
        }
    }

    /// Computes the file state from the states of its updates
    pub fn evaluate<'a>(updates: impl IntoIterator<Item = &'a Update>) -> IncomingFileState {
        if updates.into_iter().all(|u| u.state == UpdateState::Executed) {
            IncomingFileState::Done
        } else {
            IncomingFileState::Waiting
        }
    }
}

/// Tracks file completion from the update ledger
///
/// This is the `IncomingFilePort` the replay engine notifies after every
/// successful update.
#[derive(Clone)]
pub struct FileCompletionTracker {
    updates: Arc<dyn UpdateStore>,
    files: Arc<dyn IncomingFileStore>,
}

impl FileCompletionTracker {
    pub fn new(updates: Arc<dyn UpdateStore>, files: Arc<dyn IncomingFileStore>) -> Self {
        Self { updates, files }
    }
}

#[async_trait]
impl IncomingFilePort for FileCompletionTracker {
    #[instrument(skip(self), fields(file_incoming_id = %file_incoming_id))]
    async fn check_still_waiting(
        &self,
        file_incoming_id: FileIncomingId,
    ) -> Result<IncomingFileState, PortError> {
        let file = self.files.get_file(file_incoming_id).await?;
        let updates = self.updates.search(&UpdateQuery::for_file(file_incoming_id)).await?;
        let state = IncomingFile::evaluate(&updates);

        if state != file.state {
            debug!(from = file.state.as_str(), to = state.as_str(), "Incoming file state changed");
            self.files.set_file_state(file_incoming_id, state).await?;
        }

        Ok(state)
    }
}
