//! Test data builders
//!
//! Builder for update records with sensible defaults, for tests that need a
//! record in a precise state without going through the ledger.

use chrono::{DateTime, Utc};
use serde_json::Value;

use core_kernel::{FileIncomingId, UpdateId};
use domain_update::{to_canonical_json, Sequence, Update, UpdateState};

use crate::fixtures::{PayloadFixtures, RECEPTION_OBJECT_TYPE};

/// Builder for `Update` records
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    id: UpdateId,
    create_date: DateTime<Utc>,
    file_incoming_id: Option<FileIncomingId>,
    sequence: Sequence,
    state: UpdateState,
    object_type: String,
    data: String,
    result: String,
    node_number: i32,
    claimed_until: Option<DateTime<Utc>>,
}

impl Default for UpdateBuilder {
    fn default() -> Self {
        Self {
            id: UpdateId::new_v7(),
            create_date: Utc::now(),
            file_incoming_id: None,
            sequence: Sequence::new(1),
            state: UpdateState::ToExecute,
            object_type: RECEPTION_OBJECT_TYPE.to_string(),
            data: canonical(&PayloadFixtures::reception()),
            result: String::new(),
            node_number: 1,
            claimed_until: None,
        }
    }
}

fn canonical(value: &Value) -> String {
    to_canonical_json(value).unwrap_or_else(|_| value.to_string())
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Sequence::new(sequence);
        self
    }

    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = object_type.into();
        self
    }

    /// Stores the payload in canonical form
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.data = canonical(&payload);
        self
    }

    /// Stores the text as-is, which may not be JSON at all
    pub fn with_raw_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_file(mut self, file_incoming_id: FileIncomingId) -> Self {
        self.file_incoming_id = Some(file_incoming_id);
        self
    }

    pub fn with_node_number(mut self, node_number: i32) -> Self {
        self.node_number = node_number;
        self
    }

    pub fn created_at(mut self, create_date: DateTime<Utc>) -> Self {
        self.create_date = create_date;
        self
    }

    /// Sets the state without touching the result
    pub fn with_state(mut self, state: UpdateState) -> Self {
        self.state = state;
        self
    }

    pub fn executed(mut self) -> Self {
        self.state = UpdateState::Executed;
        self
    }

    pub fn failed(mut self, result: impl Into<String>) -> Self {
        self.state = UpdateState::Failed;
        self.result = result.into();
        self
    }

    /// Leaves the record claimed until the given instant
    pub fn claimed_until(mut self, until: DateTime<Utc>) -> Self {
        self.claimed_until = Some(until);
        self
    }

    pub fn build(self) -> Update {
        Update {
            id: self.id,
            create_date: self.create_date,
            file_incoming_id: self.file_incoming_id,
            sequence: self.sequence,
            state: self.state,
            object_type: self.object_type,
            data: self.data,
            result: self.result,
            node_number: self.node_number,
            claimed_until: self.claimed_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_update_is_pending_reception() {
        let update = UpdateBuilder::new().build();

        assert_eq!(update.state, UpdateState::ToExecute);
        assert_eq!(update.object_type, RECEPTION_OBJECT_TYPE);
        assert_eq!(update.payload().unwrap(), PayloadFixtures::reception());
    }

    #[test]
    fn test_failed_keeps_result() {
        let update = UpdateBuilder::new().with_sequence(7).failed("boom").build();

        assert_eq!(update.state, UpdateState::Failed);
        assert_eq!(update.result, "boom");
        assert_eq!(update.sequence.value(), 7);
    }
}
