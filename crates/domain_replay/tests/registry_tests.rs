//! Process-wide registry installation
//!
//! Kept in its own test binary: the global registry can only be set once
//! per process.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use domain_replay::{
    global, install_global, HandlerContext, HandlerError, HandlerRegistry, ObjectTypeHandler,
    ReplayConfig, ReplayEngine, ReplayError,
};
use domain_update::{
    FileCompletionTracker, InMemoryIncomingFileStore, InMemorySequenceGenerator,
    InMemoryUpdateStore, UpdateLedger,
};

struct Inventory;

#[async_trait]
impl ObjectTypeHandler for Inventory {
    async fn process(
        &self,
        _context: &HandlerContext,
        _payload: &Value,
    ) -> Result<bool, HandlerError> {
        Ok(true)
    }
}

fn register_inventories(
    builder: domain_replay::HandlerRegistryBuilder,
) -> domain_replay::HandlerRegistryBuilder {
    builder.register("INVENT", |_payload: &Value| {
        Ok(Box::new(Inventory) as Box<dyn ObjectTypeHandler>)
    })
}

#[test]
fn test_global_registry_installs_once() {
    let store = InMemoryUpdateStore::new();
    let files = InMemoryIncomingFileStore::new();
    let ledger = UpdateLedger::new(
        Arc::new(store.clone()),
        Arc::new(InMemorySequenceGenerator::new()),
        Arc::new(files.clone()),
    );
    let tracker = Arc::new(FileCompletionTracker::new(Arc::new(store), Arc::new(files)));

    assert!(global().is_none());
    let err = ReplayEngine::from_global(ledger.clone(), tracker.clone(), ReplayConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, ReplayError::RegistryNotInstalled));

    let registry = HandlerRegistry::builder().apply(register_inventories).build().unwrap();
    let installed = install_global(registry).unwrap();
    assert!(installed.contains("INVENT"));

    let engine = ReplayEngine::from_global(ledger, tracker, ReplayConfig::default()).unwrap();
    assert!(Arc::ptr_eq(engine.registry(), &installed));

    let again = install_global(HandlerRegistry::default()).unwrap_err();
    assert!(matches!(again, ReplayError::AlreadyInstalled));
    assert!(global().unwrap().contains("INVENT"));
}
