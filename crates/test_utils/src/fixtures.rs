//! Test fixtures
//!
//! Sample LX1 payloads, incoming files and a ledger wired over the in-memory
//! adapters.

use std::sync::Arc;

use serde_json::{json, Value};

use domain_replay::{HandlerRegistry, ReplayConfig, ReplayEngine};
use domain_update::{
    FileCompletionTracker, IncomingFile, IncomingFileStore, InMemoryIncomingFileStore,
    InMemorySequenceGenerator, InMemoryUpdateStore, UpdateError, UpdateLedger,
};

/// Object type of purchase order receptions
pub const RECEPTION_OBJECT_TYPE: &str = "FOUR";

/// Object type of inventory adjustments
pub const INVENTORY_OBJECT_TYPE: &str = "INVENT";

/// Sample payloads, shaped like the nodes of LX1 export files
pub struct PayloadFixtures;

impl PayloadFixtures {
    /// A purchase order reception with two lines
    pub fn reception() -> Value {
        json!({
            "NUM_BL": "IN/00042",
            "DATE_RECEPTION": "2026-10-12",
            "LIGNES": [
                {"CODE_ART": "ART-001", "QTE": 12, "LOT": "L2026-41"},
                {"CODE_ART": "ART-002", "QTE": 3, "LOT": null}
            ]
        })
    }

    /// An inventory adjustment with non-ASCII text
    pub fn inventory() -> Value {
        json!({
            "CODE_ART": "ART-001",
            "EMPLACEMENT": "Allée B, niveau 2",
            "QTE_THEORIQUE": 40,
            "QTE_REELLE": 38,
            "MOTIF": "Écart d'inventaire"
        })
    }
}

/// Sample incoming files
pub struct FileFixtures;

impl FileFixtures {
    /// A waiting purchase order export
    pub fn reception_file() -> IncomingFile {
        IncomingFile::new("FOUR_20261012_0930.xml")
    }
}

/// A ledger over the in-memory adapters, with typed access to each store
#[derive(Clone, Default)]
pub struct TestLedger {
    pub store: Arc<InMemoryUpdateStore>,
    pub sequences: Arc<InMemorySequenceGenerator>,
    pub files: Arc<InMemoryIncomingFileStore>,
}

impl TestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ledger service over these stores
    pub fn ledger(&self) -> UpdateLedger {
        UpdateLedger::new(self.store.clone(), self.sequences.clone(), self.files.clone())
    }

    /// The file completion tracker over these stores
    pub fn tracker(&self) -> Arc<FileCompletionTracker> {
        Arc::new(FileCompletionTracker::new(self.store.clone(), self.files.clone()))
    }

    /// A replay engine with the default configuration
    pub fn engine(&self, registry: HandlerRegistry) -> ReplayEngine {
        ReplayEngine::new(
            self.ledger(),
            Arc::new(registry),
            self.tracker(),
            ReplayConfig::default(),
        )
    }

    /// Stores an incoming file and returns it
    pub async fn file(&self, file: IncomingFile) -> Result<IncomingFile, UpdateError> {
        Ok(self.files.insert_file(file).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reception_fixture_has_picking_reference() {
        let payload = PayloadFixtures::reception();
        assert_eq!(payload["NUM_BL"], "IN/00042");
        assert_eq!(payload["LIGNES"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_ledger_shares_stores() {
        let harness = TestLedger::new();
        let file = harness.file(FileFixtures::reception_file()).await.unwrap();

        let stored = harness.ledger().files().get_file(file.id).await.unwrap();
        assert_eq!(stored.xml_file_name, "FOUR_20261012_0930.xml");
    }
}
