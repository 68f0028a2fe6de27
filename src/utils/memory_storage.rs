//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::ledger::LedgerSnapshot;
use crate::traits::*;
use crate::types::*;

/// In-memory storage keeping the last saved snapshot as JSON
///
/// Clones share the same slot, so a test can hand one clone to the code
/// under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    document: Arc<RwLock<Option<String>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw JSON document, if anything was saved
    pub fn document(&self) -> LedgerResult<Option<String>> {
        let document = self
            .document
            .read()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".into()))?;
        Ok(document.clone())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        let mut document = self
            .document
            .write()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".into()))?;
        *document = None;
        Ok(())
    }
}

#[async_trait]
impl BooksStorage for MemoryStorage {
    async fn save(&mut self, snapshot: &LedgerSnapshot) -> LedgerResult<()> {
        let encoded = serde_json::to_string(snapshot)?;
        let mut document = self
            .document
            .write()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".into()))?;
        *document = Some(encoded);
        Ok(())
    }

    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>> {
        match self.document()? {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }
}
