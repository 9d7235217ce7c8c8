//! Object-type handlers
//!
//! A handler knows how to apply one kind of payload to domain state. The
//! registry maps the `object_type` of an update to a factory that builds the
//! handler from the update's deserialized payload.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use core_kernel::{FileIncomingId, OperationMetadata, PortError, UpdateId};
use domain_update::{Sequence, Update};

/// Errors raised by handlers
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload does not have the shape the handler expects
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The handler could not apply the payload
    #[error("{0}")]
    Failed(String),

    /// A port the handler depends on failed
    #[error(transparent)]
    Port(#[from] PortError),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        HandlerError::InvalidPayload(message.into())
    }
}

/// What a handler knows about the update it is processing
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub update_id: UpdateId,
    pub sequence: Sequence,
    pub object_type: String,
    pub file_incoming_id: Option<FileIncomingId>,
    pub node_number: i32,
    pub metadata: OperationMetadata,
}

impl HandlerContext {
    pub fn for_update(update: &Update, metadata: OperationMetadata) -> Self {
        Self {
            update_id: update.id,
            sequence: update.sequence,
            object_type: update.object_type.clone(),
            file_incoming_id: update.file_incoming_id,
            node_number: update.node_number,
            metadata,
        }
    }
}

/// Applies one kind of payload
#[async_trait]
pub trait ObjectTypeHandler: Send + Sync {
    /// Processes the payload of one update
    ///
    /// Any `Ok` counts as success. `Ok(false)` means the handler had nothing
    /// to apply; it is logged but the update is still marked executed.
    async fn process(
        &self,
        context: &HandlerContext,
        payload: &Value,
    ) -> Result<bool, HandlerError>;
}

/// Builds a handler from the deserialized payload of an update
pub type HandlerFactory =
    Arc<dyn Fn(&Value) -> Result<Box<dyn ObjectTypeHandler>, HandlerError> + Send + Sync>;

/// Wraps a constructor taking a typed payload into a `HandlerFactory`
///
/// The payload is deserialized into `T` first; a shape mismatch becomes
/// `HandlerError::InvalidPayload`.
pub fn typed_factory<T, H, F>(constructor: F) -> HandlerFactory
where
    T: DeserializeOwned,
    H: ObjectTypeHandler + 'static,
    F: Fn(T) -> H + Send + Sync + 'static,
{
    Arc::new(move |payload: &Value| {
        let typed = T::deserialize(payload)
            .map_err(|e| HandlerError::invalid_payload(e.to_string()))?;
        Ok(Box::new(constructor(typed)) as Box<dyn ObjectTypeHandler>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Reception {
        #[serde(rename = "NUM_BL")]
        num_bl: String,
    }

    struct ReceptionHandler {
        reception: Reception,
    }

    #[async_trait]
    impl ObjectTypeHandler for ReceptionHandler {
        async fn process(
            &self,
            _context: &HandlerContext,
            _payload: &Value,
        ) -> Result<bool, HandlerError> {
            if self.reception.num_bl.is_empty() {
                return Err(HandlerError::failed("empty picking reference"));
            }
            Ok(true)
        }
    }

    fn context() -> HandlerContext {
        HandlerContext {
            update_id: UpdateId::new(),
            sequence: Sequence::new(1),
            object_type: "FOUR".to_string(),
            file_incoming_id: None,
            node_number: 1,
            metadata: OperationMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_typed_factory_builds_handler_from_payload() {
        let factory = typed_factory(|reception: Reception| ReceptionHandler { reception });
        let payload = json!({"NUM_BL": "IN/00042"});

        let handler = factory(&payload).unwrap();
        assert!(handler.process(&context(), &payload).await.unwrap());
    }

    #[test]
    fn test_typed_factory_rejects_wrong_shape() {
        let factory = typed_factory(|reception: Reception| ReceptionHandler { reception });
        let err = factory(&json!({"CODE_ART": "A-1"})).err().unwrap();
        assert!(matches!(err, HandlerError::InvalidPayload(_)));
        assert!(err.to_string().contains("NUM_BL"));
    }

    #[test]
    fn test_handler_error_display() {
        assert_eq!(
            HandlerError::failed("picking IN/1 not found").to_string(),
            "picking IN/1 not found"
        );
        let port: HandlerError = PortError::connection("refused").into();
        assert!(port.to_string().contains("refused"));
    }
}
