//! Core error types used across the system

use thiserror::Error;

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    /// Text that does not name an identifier of the expected kind
    #[error("Invalid {kind} identifier '{value}': {source}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },
}

impl CoreError {
    pub fn invalid_identifier(
        kind: &'static str,
        value: impl Into<String>,
        source: uuid::Error,
    ) -> Self {
        CoreError::InvalidIdentifier {
            kind,
            value: value.into(),
            source,
        }
    }
}
