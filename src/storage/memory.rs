//! In-process history backend for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::{HistorySnapshot, HistoryStore};

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    snapshots: RwLock<HashMap<String, HistorySnapshot>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a snapshot as if it had been saved earlier.
    pub async fn insert(&self, snapshot: HistorySnapshot) {
        self.snapshots
            .write()
            .await
            .insert(snapshot.novel_id.clone(), snapshot);
    }

    pub async fn novel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshots.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self, novel_id: &str) -> Result<HistorySnapshot> {
        Ok(self
            .snapshots
            .read()
            .await
            .get(novel_id)
            .cloned()
            .unwrap_or_else(|| HistorySnapshot::empty(novel_id)))
    }

    async fn save(&self, snapshot: &HistorySnapshot) -> Result<()> {
        let mut stored = snapshot.clone();
        stored.updated_at = Some(Utc::now());
        self.snapshots
            .write()
            .await
            .insert(stored.novel_id.clone(), stored);
        Ok(())
    }
}
