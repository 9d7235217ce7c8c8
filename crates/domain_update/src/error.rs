//! Update ledger errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the update ledger
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Deletion is disabled for update records
    #[error("Cannot delete {count} update record(s): deletion has been disabled for update records because it is important to maintain a complete audit trail")]
    ProtectedRecord { count: usize },

    /// Update with the given ID was not found
    #[error("Update not found: {0}")]
    NotFound(String),

    /// A field required at creation was not provided
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field that is fixed at creation was part of a write
    #[error("Field is read-only after creation: {0}")]
    ReadOnlyField(&'static str),

    /// A sequence value is not a non-negative integer
    #[error("Invalid execution sequence: {0:?}")]
    InvalidSequence(String),

    /// The payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The storage adapter failed
    #[error("Storage error: {0}")]
    Port(PortError),
}

impl UpdateError {
    /// Creates a NotFound error from any ID type
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        UpdateError::NotFound(id.to_string())
    }

    /// Returns true if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpdateError::NotFound(_))
    }
}

impl From<PortError> for UpdateError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { id, .. } => UpdateError::NotFound(id),
            PortError::Validation { message, field: Some(field) } if field == "sequence" => {
                UpdateError::InvalidSequence(message)
            }
            other => UpdateError::Port(other),
        }
    }
}

impl From<serde_json::Error> for UpdateError {
    fn from(error: serde_json::Error) -> Self {
        UpdateError::Serialization(error.to_string())
    }
}
