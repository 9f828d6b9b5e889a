//! Comments feed run.
//!
//! Every host with a comments feed is fetched concurrently. Comments are
//! matched to configured novels by title, normalized, deduplicated by guid
//! and published newest first. There is no history: the feed mirrors what
//! the hosts currently expose.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::feed::{render_comments_feed, write_feed};
use crate::hosts::comments::{html_to_text, split_comment_title, split_reply_chain};
use crate::hosts::CommentSource;
use crate::models::{
    Category, CommentRecord, Config, HostConfig, NovelConfig, NovelRef, RawComment,
};
use crate::pipeline::normalize::resolve_publish_time;
use crate::utils::collapse_whitespace;
use crate::utils::console;
use crate::utils::url::chapter_from_comment_link;

/// Result of one comments feed run.
#[derive(Debug, Clone, Default)]
pub struct CommentsSummary {
    pub hosts_total: usize,
    /// `(host, reason)` for every host whose comments could not be read
    pub failures: Vec<(String, String)>,
    /// Comments dropped because they name no configured novel
    pub skipped: usize,
    pub records: Vec<CommentRecord>,
    pub feed_path: Option<PathBuf>,
    pub feed_error: Option<String>,
}

impl CommentsSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.feed_error.is_none()
    }
}

/// Turn one raw comment into a record, or `None` when it names no novel of `host`.
pub fn normalize_comment(
    raw: &RawComment,
    host: &HostConfig,
    now: DateTime<Utc>,
) -> Option<CommentRecord> {
    let title = split_comment_title(&raw.title)?;
    let novel = find_novel_loose(host, &title)?;
    let novel_id = NovelRef { host, novel }.novel_id();

    let (reply_chain, body_html) = split_reply_chain(&raw.body_html);
    let body = html_to_text(&body_html);
    let link = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&novel.url)
        .to_string();
    let author = collapse_whitespace(&raw.author);
    let guid = [raw.id.as_deref(), raw.link.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fingerprint(&[&novel_id, &author, &link, &body]));
    let (published_at, time_source) = resolve_publish_time(raw.date_text.as_deref(), now);

    Some(CommentRecord {
        novel_id,
        guid,
        novel_title: novel.title.trim().to_string(),
        chapter: chapter_from_comment_link(&link),
        link,
        author,
        body,
        reply_chain,
        published_at,
        time_source,
        category: if novel.nsfw { Category::Nsfw } else { Category::Sfw },
        host: host.name.clone(),
        translator: host.translator.clone(),
    })
}

/// Case-insensitive title match with whitespace collapsed.
fn find_novel_loose<'h>(host: &'h HostConfig, title: &str) -> Option<&'h NovelConfig> {
    let wanted = collapse_whitespace(title).to_lowercase();
    host.novels
        .iter()
        .find(|n| collapse_whitespace(&n.title).to_lowercase() == wanted)
}

fn fingerprint(parts: &[&str]) -> String {
    let digest = hex::encode(Sha256::digest(parts.join("|").as_bytes()));
    digest[..16].to_string()
}

/// First occurrence of each guid wins; newest first, ties by guid.
pub fn assemble_comments(records: Vec<CommentRecord>) -> Vec<CommentRecord> {
    let mut seen = HashSet::new();
    let mut out: Vec<CommentRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.guid.clone()))
        .collect();
    out.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.guid.cmp(&b.guid))
    });
    out
}

/// Builds the comments feed from every host that publishes one.
pub struct CommentsRunner<'a> {
    config: &'a Config,
    source: &'a dyn CommentSource,
    storage_dir: Option<PathBuf>,
}

impl<'a> CommentsRunner<'a> {
    pub fn new(config: &'a Config, source: &'a dyn CommentSource) -> Self {
        Self {
            config,
            source,
            storage_dir: None,
        }
    }

    /// Write the feed under this directory; without it runs are dry.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub async fn run(&self, now: DateTime<Utc>) -> CommentsSummary {
        let hosts: Vec<&HostConfig> = self
            .config
            .hosts
            .iter()
            .filter(|h| h.comments_feed_url.is_some())
            .collect();

        console::header("COMMENTS feed");
        console::step(1, 3, &format!("Fetching comments from {} hosts", hosts.len()));

        let mut summary = CommentsSummary {
            hosts_total: hosts.len(),
            ..CommentsSummary::default()
        };
        let concurrency = self.config.crawler.max_concurrent.max(1);

        let mut results: Vec<(&HostConfig, Result<Vec<RawComment>>)> = stream::iter(hosts)
            .map(|host| async move { (host, self.source.fetch(host).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        results.sort_by(|a, b| a.0.name.cmp(&b.0.name));

        let mut records = Vec::new();
        for (host, result) in results {
            match result {
                Ok(raws) => {
                    for raw in &raws {
                        match normalize_comment(raw, host, now) {
                            Some(record) => records.push(record),
                            None => {
                                log::debug!("{}: skipping comment '{}'", host.name, raw.title);
                                summary.skipped += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    log::warn!("{} comments left out: {}", host.name, e);
                    summary.failures.push((host.name.clone(), e.to_string()));
                }
            }
        }

        console::step(2, 3, "Assembling feed");
        summary.records = assemble_comments(records);

        console::step(3, 3, "Writing feed");
        if let Some(dir) = &self.storage_dir {
            let path = self.config.comments_feed_path(dir);
            match self.write(&path, &summary.records, now).await {
                Ok(()) => summary.feed_path = Some(path),
                Err(e) => {
                    log::error!("comments feed not written: {}", e);
                    summary.feed_error = Some(e.to_string());
                }
            }
        } else {
            console::sub_item("Dry run, feed not written");
        }

        console::summary(
            "comments feed",
            &[
                ("Hosts", summary.hosts_total.to_string()),
                ("Failed", summary.failures.len().to_string()),
                ("Skipped", summary.skipped.to_string()),
                ("Items", summary.records.len().to_string()),
            ],
        );
        summary
    }

    async fn write(
        &self,
        path: &Path,
        records: &[CommentRecord],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let xml = render_comments_feed(self.config, records, now)?;
        write_feed(path, &xml).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::TimeSource;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Canned comments by host name; hosts missing from the map fail.
    #[derive(Default)]
    struct FakeSource {
        comments: HashMap<String, Vec<RawComment>>,
    }

    #[async_trait]
    impl CommentSource for FakeSource {
        async fn fetch(&self, host: &HostConfig) -> Result<Vec<RawComment>> {
            self.comments
                .get(&host.name)
                .cloned()
                .ok_or_else(|| AppError::fetch(&host.name, "HTTP 503"))
        }
    }

    fn config() -> Config {
        toml::from_str(
            r#"
            [[hosts]]
            name = "Dragonholic"
            translator = "Turtle"
            comments_feed_url = "https://dragonholic.com/comments/feed/"

            [[hosts.novels]]
            title = "The Villain"
            url = "https://dragonholic.com/novel/the-villain/"

            [[hosts.novels]]
            title = "Night Garden"
            url = "https://dragonholic.com/novel/night-garden/"
            nsfw = true

            [[hosts]]
            name = "Mistmint"
            comments_feed_url = "https://mistmint.com/comments/feed/"

            [[hosts.novels]]
            title = "Quiet Tide"
            url = "https://mistmint.com/novel/quiet-tide/"
            "#,
        )
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 22, 15, 0, 0).unwrap()
    }

    fn comment(novel: &str, id: &str, hour: u32) -> RawComment {
        let published = Utc.with_ymd_and_hms(2025, 5, 22, hour, 0, 0).unwrap();
        RawComment::new(format!("Comment on {novel} by Reader"))
            .with_author("Reader")
            .with_link("https://dragonholic.com/novel/the-villain/chapter-12/#comment-1")
            .with_body("<p>Nice</p>")
            .with_id(id)
            .with_date(published.to_rfc3339())
    }

    fn dragonholic(config: &Config) -> &HostConfig {
        config.find_host("Dragonholic").unwrap()
    }

    #[test]
    fn test_normalize_comment() {
        let config = config();
        let raw = RawComment::new("Comment on the  villain by Mira")
            .with_author(" Mira ")
            .with_link("https://dragonholic.com/novel/the-villain/chapter-12/#comment-9")
            .with_body("<p>In reply to <a href=\"#\">Kai</a>.</p><p>Agreed !</p>")
            .with_id("c-9")
            .with_date("2025-05-22T10:00:00Z");

        let record = normalize_comment(&raw, dragonholic(&config), now()).unwrap();
        assert_eq!(record.novel_id, "dragonholic/the-villain");
        assert_eq!(record.novel_title, "The Villain");
        assert_eq!(record.guid, "c-9");
        assert_eq!(record.chapter, "Chapter 12");
        assert_eq!(record.author, "Mira");
        assert_eq!(record.reply_chain, "In reply to Kai");
        assert_eq!(record.body, "Agreed!");
        assert_eq!(record.time_source, TimeSource::Absolute);
        assert_eq!(record.category, Category::Sfw);
        assert_eq!(record.translator, "Turtle");
    }

    #[test]
    fn test_normalize_comment_guid_fallbacks() {
        let config = config();
        let host = dragonholic(&config);

        let by_link = RawComment::new("Comment on Night Garden by A")
            .with_link("https://dragonholic.com/novel/night-garden/#comment-3");
        let record = normalize_comment(&by_link, host, now()).unwrap();
        assert_eq!(record.guid, "https://dragonholic.com/novel/night-garden/#comment-3");
        assert_eq!(record.chapter, "Homepage");
        assert_eq!(record.category, Category::Nsfw);
        assert_eq!(record.time_source, TimeSource::Fallback);

        let bare = RawComment::new("Comment on Night Garden by A").with_body("hi");
        let first = normalize_comment(&bare, host, now()).unwrap();
        let second = normalize_comment(&bare, host, now()).unwrap();
        assert_eq!(first.guid.len(), 16);
        assert_eq!(first.guid, second.guid);
        assert_eq!(first.link, "https://dragonholic.com/novel/night-garden/");
    }

    #[test]
    fn test_unknown_novel_is_skipped() {
        let config = config();
        let raw = RawComment::new("Comment on Someone Else's Book by A").with_id("x");
        assert!(normalize_comment(&raw, dragonholic(&config), now()).is_none());
        let news = RawComment::new("Site news");
        assert!(normalize_comment(&news, dragonholic(&config), now()).is_none());
    }

    #[test]
    fn test_assemble_comments_dedups_and_sorts_newest_first() {
        let config = config();
        let host = dragonholic(&config);
        let records = [
            comment("The Villain", "b", 9),
            comment("The Villain", "a", 9),
            comment("The Villain", "c", 11),
            comment("The Villain", "a", 8),
        ]
        .iter()
        .filter_map(|raw| normalize_comment(raw, host, now()))
        .collect();

        let assembled = assemble_comments(records);
        let guids: Vec<_> = assembled.iter().map(|r| r.guid.as_str()).collect();
        assert_eq!(guids, vec!["c", "a", "b"]);
        assert_eq!(assembled[1].published_at.format("%H").to_string(), "09");
    }

    #[tokio::test]
    async fn test_run_writes_comments_feed() {
        let config = config();
        let mut source = FakeSource::default();
        source.comments.insert(
            "Dragonholic".to_string(),
            vec![
                comment("The Villain", "1", 9),
                comment("Unknown Novel", "2", 10),
                comment("Night Garden", "3", 12),
            ],
        );
        source.comments.insert("Mistmint".to_string(), vec![comment("Quiet Tide", "4", 11)]);
        let dir = TempDir::new().unwrap();

        let summary = CommentsRunner::new(&config, &source)
            .with_storage_dir(dir.path())
            .run(now())
            .await;

        assert!(summary.is_clean());
        assert_eq!(summary.hosts_total, 2);
        assert_eq!(summary.skipped, 1);
        let guids: Vec<_> = summary.records.iter().map(|r| r.guid.as_str()).collect();
        assert_eq!(guids, vec!["3", "4", "1"]);

        let path = summary.feed_path.unwrap();
        assert!(path.ends_with("feeds/aggregated_comments_feed.xml"));
        let xml = std::fs::read_to_string(path).unwrap();
        assert_eq!(xml.matches("<item>").count(), 3);
    }

    #[tokio::test]
    async fn test_failed_host_does_not_block_others() {
        let config = config();
        let mut source = FakeSource::default();
        source.comments.insert("Mistmint".to_string(), vec![comment("Quiet Tide", "4", 11)]);

        let summary = CommentsRunner::new(&config, &source).run(now()).await;

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "Dragonholic");
        assert_eq!(summary.records.len(), 1);
        assert!(summary.feed_path.is_none());
        assert!(summary.feed_error.is_none());
    }
}
