//! Field values for the ledger write path
//!
//! Both `create` and `write` go through the same sanitization step:
//!
//! - structured payloads are serialized to pretty-printed JSON (four space
//!   indentation, non-ASCII kept verbatim) so the stored text is readable and
//!   diffs cleanly
//! - setting `state` without a `result` clears `result`, so a fresh attempt
//!   never shows the diagnostic of an older one

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use core_kernel::FileIncomingId;

use crate::error::UpdateError;
use crate::update::{Sequence, UpdateState};

/// Payload as supplied by a caller
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateData {
    /// Already serialized text, stored as-is
    Text(String),
    /// Structured data, serialized at write time
    Structured(Value),
}

impl From<Value> for UpdateData {
    fn from(value: Value) -> Self {
        UpdateData::Structured(value)
    }
}

impl From<String> for UpdateData {
    fn from(text: String) -> Self {
        UpdateData::Text(text)
    }
}

impl From<&str> for UpdateData {
    fn from(text: &str) -> Self {
        UpdateData::Text(text.to_string())
    }
}

/// Serializes a value to the canonical stored form
pub fn to_canonical_json(value: &Value) -> Result<String, UpdateError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| UpdateError::Serialization(e.to_string()))
}

/// Partial set of fields for `create` and `write`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateValues {
    pub file_incoming_id: Option<FileIncomingId>,
    pub sequence: Option<Sequence>,
    pub object_type: Option<String>,
    pub data: Option<UpdateData>,
    pub state: Option<UpdateState>,
    pub result: Option<String>,
    pub node_number: Option<i32>,
}

impl UpdateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file_incoming_id: FileIncomingId) -> Self {
        self.file_incoming_id = Some(file_incoming_id);
        self
    }

    /// Forces the sequence instead of drawing one from the generator
    pub fn sequence(mut self, sequence: impl Into<Sequence>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    pub fn data(mut self, data: impl Into<UpdateData>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn structured(mut self, value: Value) -> Self {
        self.data = Some(UpdateData::Structured(value));
        self
    }

    pub fn state(mut self, state: UpdateState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn node_number(mut self, node_number: i32) -> Self {
        self.node_number = Some(node_number);
        self
    }

    /// Applies the write-path normalization rules
    pub fn sanitize(mut self) -> Result<Self, UpdateError> {
        if let Some(UpdateData::Structured(value)) = &self.data {
            let text = to_canonical_json(value)?;
            self.data = Some(UpdateData::Text(text));
        }

        if self.state.is_some() && self.result.is_none() {
            self.result = Some(String::new());
        }

        Ok(self)
    }

    /// Returns the serialized payload after `sanitize`
    pub fn data_text(&self) -> Option<&str> {
        match &self.data {
            Some(UpdateData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Converts sanitized values into the changes a store applies on write
    ///
    /// Fields fixed at creation are rejected.
    pub fn into_changes(self) -> Result<UpdateChanges, UpdateError> {
        if self.sequence.is_some() {
            return Err(UpdateError::ReadOnlyField("sequence"));
        }
        if self.object_type.is_some() {
            return Err(UpdateError::ReadOnlyField("object_type"));
        }
        if self.node_number.is_some() {
            return Err(UpdateError::ReadOnlyField("node_number"));
        }

        let data = match self.data {
            Some(UpdateData::Text(text)) => Some(text),
            Some(UpdateData::Structured(value)) => Some(to_canonical_json(&value)?),
            None => None,
        };
        Ok(UpdateChanges {
            file_incoming_id: self.file_incoming_id,
            data,
            state: self.state,
            result: self.result,
        })
    }
}

/// Sanitized changes applied to an existing record
///
/// Stores clear the record's claim whenever `state` is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateChanges {
    pub file_incoming_id: Option<FileIncomingId>,
    pub data: Option<String>,
    pub state: Option<UpdateState>,
    pub result: Option<String>,
}

impl UpdateChanges {
    pub fn is_empty(&self) -> bool {
        self.file_incoming_id.is_none()
            && self.data.is_none()
            && self.state.is_none()
            && self.result.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_structured_data_is_pretty_printed_with_four_spaces() {
        let values = UpdateValues::new()
            .structured(json!({"CODE_ART": "A-1"}))
            .sanitize()
            .unwrap();
        assert_eq!(values.data_text(), Some("{\n    \"CODE_ART\": \"A-1\"\n}"));
    }

    #[test]
    fn test_non_ascii_kept_verbatim() {
        let text = to_canonical_json(&json!({"LIBELLE_FOURN": "Société Générale"})).unwrap();
        assert!(text.contains("Société Générale"));
    }

    #[test]
    fn test_text_data_is_untouched() {
        let values = UpdateValues::new().data("{\"a\":1}").sanitize().unwrap();
        assert_eq!(values.data_text(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_state_without_result_clears_result() {
        let values = UpdateValues::new().state(UpdateState::Executed).sanitize().unwrap();
        assert_eq!(values.result, Some(String::new()));
    }

    #[test]
    fn test_state_with_result_keeps_result() {
        let values = UpdateValues::new()
            .state(UpdateState::Failed)
            .result("Error while executing: boom")
            .sanitize()
            .unwrap();
        assert_eq!(values.result.as_deref(), Some("Error while executing: boom"));
    }

    #[test]
    fn test_result_alone_is_not_touched() {
        let values = UpdateValues::new().sanitize().unwrap();
        assert_eq!(values.result, None);
    }

    #[test]
    fn test_into_changes_rejects_read_only_fields() {
        let err = UpdateValues::new().object_type("FOUR").into_changes().unwrap_err();
        assert!(matches!(err, UpdateError::ReadOnlyField("object_type")));

        let err = UpdateValues::new().sequence(Sequence::new(4)).into_changes().unwrap_err();
        assert!(matches!(err, UpdateError::ReadOnlyField("sequence")));

        let err = UpdateValues::new().node_number(2).into_changes().unwrap_err();
        assert!(matches!(err, UpdateError::ReadOnlyField("node_number")));
    }

    #[test]
    fn test_into_changes_carries_sanitized_fields() {
        let changes = UpdateValues::new()
            .structured(json!([1, 2]))
            .state(UpdateState::ToExecute)
            .sanitize()
            .unwrap()
            .into_changes()
            .unwrap();
        assert_eq!(changes.data.as_deref(), Some("[\n    1,\n    2\n]"));
        assert_eq!(changes.state, Some(UpdateState::ToExecute));
        assert_eq!(changes.result.as_deref(), Some(""));
        assert!(!changes.is_empty());
    }

    fn payload() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z éàü]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[A-Z_]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn canonical_json_reads_back_identically(value in payload()) {
            let text = to_canonical_json(&value).unwrap();
            let parsed: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(parsed, value);
        }
    }
}
