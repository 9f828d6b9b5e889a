//! One batch run for one feed kind.
//!
//! Per novel: scrape, append overrides, normalize, guard, then merge against
//! history under the novel's lock and commit. Novels run with bounded
//! concurrency; a failing novel is logged and left out of the feed without
//! touching its history. The feed is rendered only after every commit.
//! A dry run reads history without side effects and commits nothing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::feed::{render_feed, write_feed};
use crate::hosts::HostRegistry;
use crate::models::{ChapterRecord, Config, FeedKind, NovelRef};
use crate::overrides::Overrides;
use crate::pipeline::assemble::assemble;
use crate::pipeline::guard::ScrapeGuard;
use crate::pipeline::merge::{MergeOutcome, MergeReport, merge};
use crate::pipeline::normalize::{NormalizeContext, normalize_all};
use crate::storage::{HistorySnapshot, HistoryStore, NovelLocks};
use crate::utils::console;

/// Result of one feed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: FeedKind,
    pub novels_total: usize,
    pub novels_merged: usize,
    /// `(novel_id, reason)` for every novel left out of the feed
    pub failures: Vec<(String, String)>,
    pub added: usize,
    pub evicted: usize,
    /// Records published, in feed order
    pub records: Vec<ChapterRecord>,
    /// Where the feed was written, if it was
    pub feed_path: Option<PathBuf>,
    pub feed_error: Option<String>,
}

impl RunSummary {
    fn new(kind: FeedKind, novels_total: usize) -> Self {
        Self {
            kind,
            novels_total,
            novels_merged: 0,
            failures: Vec::new(),
            added: 0,
            evicted: 0,
            records: Vec::new(),
            feed_path: None,
            feed_error: None,
        }
    }

    /// True when every novel merged and the feed was written.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.feed_error.is_none()
    }
}

/// Runs feeds against a fixed configuration and set of collaborators.
pub struct FeedRunner<'a> {
    config: &'a Config,
    registry: &'a HostRegistry,
    store: &'a dyn HistoryStore,
    locks: NovelLocks,
    overrides: Overrides,
    storage_dir: Option<PathBuf>,
    commit: bool,
}

impl<'a> FeedRunner<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a HostRegistry,
        store: &'a dyn HistoryStore,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            locks: NovelLocks::new(),
            overrides: Overrides::default(),
            storage_dir: None,
            commit: true,
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Share locks with other runners working on the same history.
    pub fn with_locks(mut self, locks: NovelLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Write feeds under this directory; without it no feed file is written.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Merge and render without saving history or writing feeds.
    pub fn dry_run(mut self) -> Self {
        self.commit = false;
        self.storage_dir = None;
        self
    }

    /// Run one feed kind end to end.
    pub async fn run(&self, kind: FeedKind, now: DateTime<Utc>) -> RunSummary {
        let novels: Vec<NovelRef<'_>> = self
            .config
            .all_novels()
            .into_iter()
            .filter(|n| n.novel.in_feed(kind))
            .collect();

        console::header(&format!("{} feed", kind.as_str().to_uppercase()));
        console::step(1, 3, &format!("Scraping and merging {} novels", novels.len()));

        let mut summary = RunSummary::new(kind, novels.len());
        let concurrency = self.config.crawler.max_concurrent.max(1);

        let mut results: Vec<(String, Result<MergeOutcome>)> = stream::iter(novels)
            .map(|novel| async move {
                let result = self.process_novel(novel, kind, now).await;
                (novel.novel_id(), result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut merged = Vec::new();
        for (novel_id, result) in results {
            match result {
                Ok(outcome) => {
                    summary.novels_merged += 1;
                    summary.added += outcome.report.added.len();
                    summary.evicted += outcome.report.evicted.len();
                    merged.push(outcome.records);
                }
                Err(e) => {
                    log::warn!("{} left out of the {} feed: {}", novel_id, kind, e);
                    summary.failures.push((novel_id, e.to_string()));
                }
            }
        }

        console::step(2, 3, "Assembling feed");
        summary.records = assemble(merged);

        console::step(3, 3, "Writing feed");
        if let Some(dir) = &self.storage_dir {
            let path = self.config.feed_path(dir, kind);
            match self.write(&path, kind, &summary.records, now).await {
                Ok(()) => summary.feed_path = Some(path),
                Err(e) => {
                    log::error!("{} feed not written: {}", kind, e);
                    summary.feed_error = Some(e.to_string());
                }
            }
        } else {
            console::sub_item("Dry run, feed not written");
        }

        console::summary(
            &format!("{} feed", kind),
            &[
                ("Novels", summary.novels_total.to_string()),
                ("Merged", summary.novels_merged.to_string()),
                ("Failed", summary.failures.len().to_string()),
                ("Items", summary.records.len().to_string()),
                ("New", summary.added.to_string()),
                ("Evicted", summary.evicted.to_string()),
            ],
        );
        summary
    }

    async fn write(
        &self,
        path: &Path,
        kind: FeedKind,
        records: &[ChapterRecord],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let xml = render_feed(self.config, kind, records, now)?;
        write_feed(path, &xml).await
    }

    async fn process_novel(
        &self,
        novel: NovelRef<'_>,
        kind: FeedKind,
        now: DateTime<Utc>,
    ) -> Result<MergeOutcome> {
        let novel_id = novel.novel_id();
        let adapter = self.registry.get(&novel.host.name)?;

        let mut raws = if adapter.supports(novel, kind) {
            let delay = Duration::from_millis(self.config.crawler.request_delay_ms);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            adapter.scrape(novel, kind).await?
        } else {
            Vec::new()
        };
        raws.extend(self.overrides.for_novel(novel, kind));

        let ctx = NormalizeContext {
            novel,
            kind,
            adapter: adapter.as_ref(),
        };
        let batch = normalize_all(&raws, &ctx, now);
        ScrapeGuard::new(self.config.merge.max_malformed_percent).validate(
            &novel_id,
            batch.records.len(),
            batch.malformed.len(),
        )?;

        let window_days = self.config.merge.window_days;
        if !kind.uses_history() {
            let empty = HistorySnapshot::empty(&novel_id);
            let outcome = merge(&novel_id, batch.records, &empty, window_days, now);
            log_report(&novel_id, &outcome.report);
            return Ok(outcome);
        }

        let _lock = self.locks.lock(&novel_id).await;
        let loaded = if self.commit {
            self.store.load(&novel_id).await
        } else {
            self.store.peek(&novel_id).await
        };
        let history = match loaded {
            Ok(snapshot) => snapshot,
            Err(AppError::HistoryCorrupt { message, .. }) => {
                log::warn!("{}: starting from empty history ({})", novel_id, message);
                HistorySnapshot::empty(&novel_id)
            }
            Err(e) => return Err(e),
        };

        let outcome = merge(&novel_id, batch.records, &history, window_days, now);
        if self.commit {
            self.store.save(&outcome.history).await?;
        } else {
            log::debug!("{}: dry run, history not saved", novel_id);
        }
        log_report(&novel_id, &outcome.report);
        Ok(outcome)
    }
}

fn log_report(novel_id: &str, report: &MergeReport) {
    if report.has_changes() {
        log::info!(
            "{}: {} new, {} refreshed, {} retained, {} evicted",
            novel_id,
            report.added.len(),
            report.refreshed.len(),
            report.retained.len(),
            report.evicted.len()
        );
    } else {
        log::debug!(
            "{}: no changes ({} refreshed, {} retained)",
            novel_id,
            report.refreshed.len(),
            report.retained.len()
        );
    }
}
