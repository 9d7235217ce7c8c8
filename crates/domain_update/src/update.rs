//! The update record and its lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use core_kernel::{FileIncomingId, UpdateId};

use crate::error::UpdateError;

/// Scope name used to draw execution sequences for update records
pub const UPDATE_SEQUENCE_SCOPE: &str = "lx.update";

/// Execution order key of an update
///
/// Sequences are persisted as text but always compared as integers, so
/// `"10"` sorts after `"9"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Sequence {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UpdateError::InvalidSequence(s.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Sequence)
            .map_err(|_| UpdateError::InvalidSequence(s.to_string()))
    }
}

impl From<u64> for Sequence {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Lifecycle state of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    #[default]
    ToExecute,
    Executed,
    Failed,
}

impl UpdateState {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateState::ToExecute => "to_execute",
            UpdateState::Executed => "executed",
            UpdateState::Failed => "failed",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            UpdateState::ToExecute => "To Execute",
            UpdateState::Executed => "Executed",
            UpdateState::Failed => "Failed",
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateState {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_execute" => Ok(UpdateState::ToExecute),
            "executed" => Ok(UpdateState::Executed),
            "failed" => Ok(UpdateState::Failed),
            other => Err(UpdateError::Serialization(format!("unknown update state '{}'", other))),
        }
    }
}

/// One unit of change received from LX1, derived from a single XML node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: UpdateId,
    pub create_date: DateTime<Utc>,
    /// The file that is responsible for this update
    pub file_incoming_id: Option<FileIncomingId>,
    pub sequence: Sequence,
    pub state: UpdateState,
    /// The type of data contained in this update, used to pick its handler
    pub object_type: String,
    /// Pretty-printed JSON payload
    pub data: String,
    /// Errors raised while executing the update
    pub result: String,
    /// Position of the source node in the XML document
    pub node_number: i32,
    /// Expiry of the claim held by a running replay, if any
    pub claimed_until: Option<DateTime<Utc>>,
}

impl Update {
    /// Deserializes the stored payload
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.data)
    }

    pub fn is_executed(&self) -> bool {
        self.state == UpdateState::Executed
    }

    /// Returns true if a replay holds an unexpired claim on this update
    pub fn is_claimed_at(&self, now: DateTime<Utc>) -> bool {
        self.claimed_until.is_some_and(|until| until > now)
    }

    /// Returns true if a replay may claim this update at `now`
    pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_executed() && !self.is_claimed_at(now)
    }

    /// Key that orders updates for replay: numeric sequence, then creation
    pub fn replay_key(&self) -> (Sequence, DateTime<Utc>, UpdateId) {
        (self.sequence, self.create_date, self.id)
    }

    /// Composes the record name from the parent file name and node number
    pub fn display_name(&self, xml_file_name: Option<&str>) -> String {
        match xml_file_name {
            Some(name) => format!("{}, Node {}", name, self.node_number),
            None => format!("Node {}", self.node_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(state: UpdateState) -> Update {
        Update {
            id: UpdateId::new_v7(),
            create_date: Utc::now(),
            file_incoming_id: None,
            sequence: Sequence::new(7),
            state,
            object_type: "FOUR".to_string(),
            data: "{\n    \"NUM_BL\": \"IN/0001\"\n}".to_string(),
            result: String::new(),
            node_number: 3,
            claimed_until: None,
        }
    }

    #[test]
    fn test_sequence_numeric_ordering() {
        let nine: Sequence = "9".parse().unwrap();
        let ten: Sequence = "10".parse().unwrap();
        assert!(nine < ten);
        assert!("9" > "10");
    }

    #[test]
    fn test_sequence_rejects_non_numeric() {
        assert!("abc".parse::<Sequence>().is_err());
        assert!("-1".parse::<Sequence>().is_err());
        assert!("".parse::<Sequence>().is_err());
        assert!("1.5".parse::<Sequence>().is_err());
    }

    #[test]
    fn test_sequence_accepts_padding_and_whitespace() {
        assert_eq!("0042".parse::<Sequence>().unwrap(), Sequence::new(42));
        assert_eq!(" 5 ".parse::<Sequence>().unwrap(), Sequence::new(5));
    }

    #[test]
    fn test_state_round_trip() {
        for state in [UpdateState::ToExecute, UpdateState::Executed, UpdateState::Failed] {
            assert_eq!(state.as_str().parse::<UpdateState>().unwrap(), state);
        }
        assert_eq!(UpdateState::default(), UpdateState::ToExecute);
    }

    #[test]
    fn test_display_name() {
        let update = sample(UpdateState::ToExecute);
        assert_eq!(update.display_name(Some("FOUR_20240101.xml")), "FOUR_20240101.xml, Node 3");
        assert_eq!(update.display_name(None), "Node 3");
    }

    #[test]
    fn test_claimability() {
        let now = Utc::now();
        let mut update = sample(UpdateState::Failed);
        assert!(update.is_claimable_at(now));

        update.claimed_until = Some(now + chrono::Duration::seconds(30));
        assert!(update.is_claimed_at(now));
        assert!(!update.is_claimable_at(now));

        update.claimed_until = Some(now - chrono::Duration::seconds(1));
        assert!(update.is_claimable_at(now));

        let executed = sample(UpdateState::Executed);
        assert!(!executed.is_claimable_at(now));
    }

    #[test]
    fn test_payload_parses_data() {
        let update = sample(UpdateState::ToExecute);
        assert_eq!(update.payload().unwrap()["NUM_BL"], "IN/0001");
    }

    proptest! {
        #[test]
        fn sequence_order_is_numeric(a in any::<u64>(), b in any::<u64>()) {
            let parsed_a: Sequence = a.to_string().parse().unwrap();
            let parsed_b: Sequence = b.to_string().parse().unwrap();
            prop_assert_eq!(parsed_a.cmp(&parsed_b), a.cmp(&b));
        }
    }
}
