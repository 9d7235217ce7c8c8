//! Update DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_replay::{RecordReport, ReplaySummary};
use domain_update::Update;

/// Default page size for update listing
pub const DEFAULT_LIMIT: u32 = 100;

/// Maximum page size for update listing
pub const MAX_LIMIT: u32 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListUpdatesQuery {
    pub state: Option<String>,
    pub object_type: Option<String>,
    pub file_incoming_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExecuteRequest {
    #[validate(length(min = 1, message = "at least one update id is required"))]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub id: String,
    /// `"<xml file name>, Node <n>"`, only on single-record reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sequence: u64,
    pub state: String,
    pub object_type: String,
    pub file_incoming_id: Option<String>,
    pub node_number: i32,
    pub data: String,
    pub result: String,
    pub create_date: DateTime<Utc>,
    pub claimed_until: Option<DateTime<Utc>>,
}

impl UpdateResponse {
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }
}

impl From<Update> for UpdateResponse {
    fn from(update: Update) -> Self {
        Self {
            id: update.id.to_string(),
            name: None,
            sequence: update.sequence.value(),
            state: update.state.as_str().to_string(),
            object_type: update.object_type,
            file_incoming_id: update.file_incoming_id.map(|id| id.to_string()),
            node_number: update.node_number,
            data: update.data,
            result: update.result,
            create_date: update.create_date,
            claimed_until: update.claimed_until,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub executed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub records: Vec<RecordReport>,
}

impl From<ReplaySummary> for ExecuteResponse {
    fn from(summary: ReplaySummary) -> Self {
        Self {
            executed: summary.executed().len(),
            failed: summary.failed().len(),
            skipped: summary.skipped().len(),
            records: summary.records,
        }
    }
}
