//! Merge of a fresh scrape against a novel's history.
//!
//! Steps:
//! 1. Dedup the scrape by guid, keeping the later `published_at`.
//! 2. Insert unknown guids; for known guids keep the stored publish time and
//!    refresh only presentation fields.
//! 3. Keep history entries missing from the scrape only while they are inside
//!    the retention window.
//! 4. Sort by `(chapter_key, published_at, guid)`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChapterRecord;
use crate::storage::{HistoryEntry, HistorySnapshot};

/// Guids touched by a merge, grouped by what happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Seen for the first time
    pub added: Vec<String>,
    /// Known and seen again
    pub refreshed: Vec<String>,
    /// Known, missing from the scrape, still inside the window
    pub retained: Vec<String>,
    /// Known, missing from the scrape, outside the window
    pub evicted: Vec<String>,
    /// Scraped entries dropped as guid duplicates
    pub duplicates: usize,
}

impl MergeReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.evicted.is_empty()
    }
}

/// Output of one merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Records to publish, in feed order
    pub records: Vec<ChapterRecord>,
    /// Snapshot to persist
    pub history: HistorySnapshot,
    pub report: MergeReport,
}

/// Merge a novel's scraped records into its history.
///
/// Pure: the same inputs and `now` always give the same outcome, and feeding
/// the outcome's history back with the same scrape reproduces it.
pub fn merge(
    novel_id: &str,
    scraped: Vec<ChapterRecord>,
    history: &HistorySnapshot,
    window_days: i64,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut report = MergeReport::default();
    let fresh = dedup_by_guid(scraped, &mut report);

    let mut entries = history.entries.clone();
    let mut seen = HashSet::with_capacity(fresh.len());

    for record in fresh {
        seen.insert(record.guid.clone());
        match entries.get_mut(&record.guid) {
            Some(entry) => {
                entry.record.refresh_presentation(&record);
                report.refreshed.push(record.guid.clone());
            }
            None => {
                report.added.push(record.guid.clone());
                entries.insert(
                    record.guid.clone(),
                    HistoryEntry {
                        record,
                        first_seen: now,
                    },
                );
            }
        }
    }

    let window = TimeDelta::try_days(window_days).unwrap_or(TimeDelta::MAX);
    entries.retain(|guid, entry| {
        if seen.contains(guid) {
            return true;
        }
        let age = now.signed_duration_since(entry.record.published_at);
        if age <= window {
            report.retained.push(guid.clone());
            true
        } else {
            report.evicted.push(guid.clone());
            false
        }
    });

    let mut records: Vec<ChapterRecord> = entries.values().map(|e| e.record.clone()).collect();
    sort_records(&mut records);

    MergeOutcome {
        records,
        history: HistorySnapshot {
            novel_id: novel_id.to_string(),
            updated_at: history.updated_at,
            entries,
        },
        report,
    }
}

/// Sort by `(chapter_key, published_at, guid)` ascending.
pub fn sort_records(records: &mut [ChapterRecord]) {
    records.sort_by(|a, b| {
        a.chapter_key
            .cmp(&b.chapter_key)
            .then(a.published_at.cmp(&b.published_at))
            .then_with(|| a.guid.cmp(&b.guid))
    });
}

/// Collapse duplicate guids in scrape order; ties keep the first occurrence.
fn dedup_by_guid(scraped: Vec<ChapterRecord>, report: &mut MergeReport) -> Vec<ChapterRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<ChapterRecord> = Vec::with_capacity(scraped.len());

    for record in scraped {
        match index.get(&record.guid) {
            Some(&i) => {
                report.duplicates += 1;
                if record.published_at > kept[i].published_at {
                    kept[i] = record;
                }
            }
            None => {
                index.insert(record.guid.clone(), kept.len());
                kept.push(record);
            }
        }
    }
    kept
}
