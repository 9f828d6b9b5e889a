//! Local filesystem history backend.
//!
//! One pretty-printed JSON document per novel. Writes go to a sibling temp
//! file which is flushed, synced and renamed over the target.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::{HistorySnapshot, HistoryStore};

/// Write bytes atomically (write to temp, sync, then rename).
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// History backend storing `{dir}/{file}.json` per novel.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    dir: PathBuf,
    file_names: HashMap<String, String>,
}

impl LocalHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_names: HashMap::new(),
        }
    }

    /// Build a store honoring each novel's `history_file` setting.
    pub fn from_config(config: &Config, storage_dir: &Path) -> Self {
        let mut store = Self::new(config.history_dir(storage_dir));
        for novel_ref in config.all_novels() {
            store = store.with_file_name(novel_ref.novel_id(), novel_ref.history_stem());
        }
        store
    }

    /// Use a fixed file name (without extension) for a novel.
    pub fn with_file_name(mut self, novel_id: impl Into<String>, file: impl Into<String>) -> Self {
        let file = file.into();
        let stem = file.strip_suffix(".json").unwrap_or(&file).to_string();
        self.file_names.insert(novel_id.into(), stem);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a novel's history document.
    pub fn path_for(&self, novel_id: &str) -> PathBuf {
        let stem = self
            .file_names
            .get(novel_id)
            .cloned()
            .unwrap_or_else(|| novel_id.replace('/', "__"));
        self.dir.join(format!("{stem}.json"))
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Move an unreadable document aside so the next save starts clean.
    async fn quarantine(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".corrupt");
        let target = PathBuf::from(name);
        if let Err(e) = tokio::fs::rename(path, &target).await {
            log::warn!("Could not move {:?} aside: {}", path, e);
        }
        target
    }

    /// Parse a history document and check that it belongs to `novel_id`.
    fn decode(novel_id: &str, bytes: &[u8]) -> std::result::Result<HistorySnapshot, String> {
        let snapshot: HistorySnapshot =
            serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if snapshot.novel_id == novel_id {
            Ok(snapshot)
        } else {
            Err(format!("document belongs to '{}'", snapshot.novel_id))
        }
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn load(&self, novel_id: &str) -> Result<HistorySnapshot> {
        let path = self.path_for(novel_id);
        let Some(bytes) = Self::read_bytes(&path).await? else {
            return Ok(HistorySnapshot::empty(novel_id));
        };

        match Self::decode(novel_id, &bytes) {
            Ok(snapshot) => Ok(snapshot),
            Err(message) => {
                let moved = Self::quarantine(&path).await;
                log::warn!("History for {} is corrupt, moved to {:?}", novel_id, moved);
                Err(AppError::history_corrupt(novel_id, message))
            }
        }
    }

    async fn peek(&self, novel_id: &str) -> Result<HistorySnapshot> {
        let path = self.path_for(novel_id);
        match Self::read_bytes(&path).await? {
            Some(bytes) => Self::decode(novel_id, &bytes)
                .map_err(|message| AppError::history_corrupt(novel_id, message)),
            None => Ok(HistorySnapshot::empty(novel_id)),
        }
    }

    async fn save(&self, snapshot: &HistorySnapshot) -> Result<()> {
        let mut stored = snapshot.clone();
        stored.updated_at = Some(Utc::now());
        let bytes = serde_json::to_vec_pretty(&stored)?;
        let path = self.path_for(&snapshot.novel_id);
        write_atomic(&path, &bytes).await?;
        log::debug!(
            "Saved {} history entries for {} to {:?}",
            stored.len(),
            stored.novel_id,
            path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ChapterKey, ChapterRecord, TimeSource, TitleParts};
    use crate::storage::HistoryEntry;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_snapshot(novel_id: &str) -> HistorySnapshot {
        let published_at = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        let record = ChapterRecord {
            novel_id: novel_id.to_string(),
            guid: "1201".to_string(),
            chapter_key: ChapterKey::new(vec![10.0, 2.0]),
            title_parts: TitleParts::new("Villain", "Chapter 10 Part 2", "Ünïcode ✓"),
            published_at,
            time_source: TimeSource::Relative,
            link: "https://example.com/novel/villain/chapter-10-2/".to_string(),
            description: "<p>Summary &amp; more</p>".to_string(),
            price_marker: "5".to_string(),
            category: Category::Nsfw,
            volume: "Volume 1: The Beginning".to_string(),
            host: "Dragonholic".to_string(),
            translator: "Turtle".to_string(),
        };
        let mut snapshot = HistorySnapshot::empty(novel_id);
        snapshot.entries.insert(
            "1201".to_string(),
            HistoryEntry {
                record,
                first_seen: published_at,
            },
        );
        snapshot
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(dir.path());
        let snapshot = store.load("dragonholic/villain").await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_save_load_is_lossless() {
        let dir = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(dir.path());
        let snapshot = sample_snapshot("dragonholic/villain");

        store.save(&snapshot).await.unwrap();
        let loaded = store.load("dragonholic/villain").await.unwrap();

        assert!(loaded.updated_at.is_some());
        assert_eq!(loaded.entries, snapshot.entries);
        assert!(dir.path().join("dragonholic__villain.json").exists());
        assert!(!dir.path().join("dragonholic__villain.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_custom_file_name() {
        let dir = TempDir::new().unwrap();
        let store =
            LocalHistoryStore::new(dir.path()).with_file_name("dragonholic/villain", "tvitpa.json");
        store.save(&sample_snapshot("dragonholic/villain")).await.unwrap();
        assert!(dir.path().join("tvitpa.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(dir.path());
        let path = store.path_for("dragonholic/villain");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = store.load("dragonholic/villain").await.unwrap_err();
        assert!(matches!(err, AppError::HistoryCorrupt { .. }));
        assert!(!path.exists());
        assert!(dir.path().join("dragonholic__villain.json.corrupt").exists());

        // Next load starts from scratch.
        assert!(store.load("dragonholic/villain").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_peek_leaves_corrupt_file_in_place() {
        let dir = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(dir.path());
        let path = store.path_for("dragonholic/villain");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = store.peek("dragonholic/villain").await.unwrap_err();
        assert!(matches!(err, AppError::HistoryCorrupt { .. }));
        assert!(path.exists());
        assert!(!dir.path().join("dragonholic__villain.json.corrupt").exists());
    }

    #[tokio::test]
    async fn test_peek_reads_saved_history() {
        let dir = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(dir.path());
        store.save(&sample_snapshot("dragonholic/villain")).await.unwrap();
        assert_eq!(store.peek("dragonholic/villain").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_from_config_uses_history_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.hosts[0].novels[0].history_file = Some("tvitpa_history.json".to_string());
        let store = LocalHistoryStore::from_config(&config, dir.path());
        let novel_id = config.all_novels()[0].novel_id();
        assert_eq!(
            store.path_for(&novel_id),
            dir.path().join("history").join("tvitpa_history.json")
        );
    }

    #[tokio::test]
    async fn test_foreign_document_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(dir.path()).with_file_name("host/b", "shared");
        let other = LocalHistoryStore::new(dir.path()).with_file_name("host/a", "shared");
        other.save(&sample_snapshot("host/a")).await.unwrap();

        let err = store.load("host/b").await.unwrap_err();
        assert!(matches!(err, AppError::HistoryCorrupt { .. }));
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("feed.xml");
        write_atomic(&path, b"one").await.unwrap();
        write_atomic(&path, b"two").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"two");
    }
}
