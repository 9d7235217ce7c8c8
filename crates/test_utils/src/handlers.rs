//! Object-type handlers for tests
//!
//! `RecordingHandler` appends every invocation to a shared log so tests can
//! assert on what was replayed and in which order. `FailingHandler` always
//! fails with a fixed message.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use core_kernel::UpdateId;
use domain_replay::{HandlerContext, HandlerError, HandlerRegistryBuilder, ObjectTypeHandler};

/// One handler call, as seen by the handler
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub update_id: UpdateId,
    pub sequence: u64,
    pub object_type: String,
    pub payload: Value,
}

/// Shared, ordered log of handler calls
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, invocation: Invocation) -> Result<(), HandlerError> {
        self.calls
            .lock()
            .map_err(|_| HandlerError::failed("invocation log poisoned"))?
            .push(invocation);
        Ok(())
    }

    /// Snapshot of every call so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Sequences in call order
    pub fn sequences(&self) -> Vec<u64> {
        self.calls().into_iter().map(|c| c.sequence).collect()
    }

    pub fn len(&self) -> usize {
        self.calls().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of calls made for the given update
    pub fn count_for(&self, update_id: UpdateId) -> usize {
        self.calls().iter().filter(|c| c.update_id == update_id).count()
    }
}

/// Records each call in an `InvocationLog` and succeeds
pub struct RecordingHandler {
    log: InvocationLog,
}

impl RecordingHandler {
    pub fn new(log: InvocationLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl ObjectTypeHandler for RecordingHandler {
    async fn process(
        &self,
        context: &HandlerContext,
        payload: &Value,
    ) -> Result<bool, HandlerError> {
        self.log.push(Invocation {
            update_id: context.update_id,
            sequence: context.sequence.value(),
            object_type: context.object_type.clone(),
            payload: payload.clone(),
        })?;
        Ok(true)
    }
}

/// Always fails with the same message
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl ObjectTypeHandler for FailingHandler {
    async fn process(
        &self,
        _context: &HandlerContext,
        _payload: &Value,
    ) -> Result<bool, HandlerError> {
        Err(HandlerError::failed(self.message.clone()))
    }
}

/// Registers a `RecordingHandler` for each object type, all sharing `log`
///
/// Meant for `HandlerRegistryBuilder::apply`.
pub fn recording(
    log: &InvocationLog,
    object_types: &[&str],
) -> impl FnOnce(HandlerRegistryBuilder) -> HandlerRegistryBuilder {
    let log = log.clone();
    let object_types: Vec<String> = object_types.iter().map(|t| t.to_string()).collect();
    move |mut builder: HandlerRegistryBuilder| {
        for object_type in object_types {
            let log = log.clone();
            builder = builder.register(object_type, move |_payload: &Value| {
                Ok(Box::new(RecordingHandler::new(log.clone())) as Box<dyn ObjectTypeHandler>)
            });
        }
        builder
    }
}

/// Registers a `FailingHandler` for the object type
pub fn failing(
    object_type: &str,
    message: &str,
) -> impl FnOnce(HandlerRegistryBuilder) -> HandlerRegistryBuilder {
    let object_type = object_type.to_string();
    let message = message.to_string();
    move |builder: HandlerRegistryBuilder| {
        builder.register(object_type, move |_payload: &Value| {
            Ok(Box::new(FailingHandler::new(message.clone())) as Box<dyn ObjectTypeHandler>)
        })
    }
}
