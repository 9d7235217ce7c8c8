//! Replay engine errors

use thiserror::Error;

use domain_update::UpdateError;

use crate::handler::HandlerError;

/// Errors that can occur while replaying updates
///
/// `UnknownObjectType`, `Deserialization` and `HandlerExecution` concern a
/// single record: the engine stores them on the record and moves on. The
/// others are returned to the caller.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Unknown object type '{0}': no handler is registered for it")]
    UnknownObjectType(String),

    #[error("Could not deserialize update data: {0}")]
    Deserialization(String),

    #[error("{0}")]
    HandlerExecution(String),

    #[error("A handler is already registered for object type '{0}'")]
    DuplicateObjectType(String),

    #[error("The global handler registry is already installed")]
    AlreadyInstalled,

    #[error("The global handler registry has not been installed")]
    RegistryNotInstalled,

    #[error(transparent)]
    Ledger(#[from] UpdateError),
}

impl ReplayError {
    /// Returns true for failures that belong to one record rather than the batch
    pub fn is_record_failure(&self) -> bool {
        matches!(
            self,
            ReplayError::UnknownObjectType(_)
                | ReplayError::Deserialization(_)
                | ReplayError::HandlerExecution(_)
        )
    }
}

impl From<HandlerError> for ReplayError {
    fn from(error: HandlerError) -> Self {
        ReplayError::HandlerExecution(error.to_string())
    }
}
