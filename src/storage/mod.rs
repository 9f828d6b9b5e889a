//! Persisted per-novel chapter history.
//!
//! Only the paid feed is backed by history: its chapters vanish from the host
//! listing once they turn free, so the last-known records are kept until they
//! age out of the retention window.
//!
//! ## Directory Structure
//!
//! ```text
//! {storage_dir}/
//! └── history/
//!     ├── dragonholic__villain.json
//!     └── mistmint-haven__beauty.json
//! ```

pub mod local;
pub mod lock;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ChapterRecord;

pub use local::{LocalHistoryStore, write_atomic};
pub use lock::NovelLocks;
pub use memory::MemoryHistoryStore;

/// A stored record plus the time it was first accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: ChapterRecord,
    pub first_seen: DateTime<Utc>,
}

/// All known records of one novel, keyed by guid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub novel_id: String,

    /// Time of the last successful save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub entries: BTreeMap<String, HistoryEntry>,
}

impl HistorySnapshot {
    pub fn empty(novel_id: impl Into<String>) -> Self {
        Self {
            novel_id: novel_id.into(),
            updated_at: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, guid: &str) -> Option<&HistoryEntry> {
        self.entries.get(guid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored records in guid order.
    pub fn records(&self) -> impl Iterator<Item = &ChapterRecord> {
        self.entries.values().map(|e| &e.record)
    }
}

/// Trait for history storage backends.
///
/// `save` must replace the novel's snapshot atomically: a reader sees either
/// the previous snapshot or the new one, never a mix.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load a novel's snapshot; a novel never saved yields an empty snapshot.
    async fn load(&self, novel_id: &str) -> Result<HistorySnapshot>;

    /// Read a novel's snapshot without side effects on the backend.
    ///
    /// Backends that repair or move documents on `load` must not do so here.
    async fn peek(&self, novel_id: &str) -> Result<HistorySnapshot> {
        self.load(novel_id).await
    }

    /// Persist a novel's snapshot.
    async fn save(&self, snapshot: &HistorySnapshot) -> Result<()>;
}
