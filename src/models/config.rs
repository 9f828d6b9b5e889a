//! Application configuration structures.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AdapterKind, FeedKind, HostConfig, NovelRef};

/// Root application configuration.
///
/// Loaded once at startup and passed down immutably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Merge and retention settings
    #[serde(default)]
    pub merge: MergeConfig,

    /// Feed output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Host and novel definitions
    #[serde(default = "defaults::default_hosts")]
    pub hosts: Vec<HostConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.merge.window_days <= 0 {
            return Err(AppError::validation("merge.window_days must be > 0"));
        }
        if self.merge.max_malformed_percent > 100 {
            return Err(AppError::validation(
                "merge.max_malformed_percent must be <= 100",
            ));
        }
        if self.hosts.is_empty() {
            return Err(AppError::validation("No hosts defined"));
        }

        let mut host_names = HashSet::new();
        let mut novel_ids = HashSet::new();
        let mut history_stems = HashMap::new();
        for host in &self.hosts {
            if !host_names.insert(host.name.trim().to_lowercase()) {
                return Err(AppError::validation(format!(
                    "Duplicate host '{}'",
                    host.name
                )));
            }
            if host.adapter == AdapterKind::Rss
                && host.feed_url.is_none()
                && host.paid_feed_url.is_none()
            {
                return Err(AppError::validation(format!(
                    "Host '{}' uses the rss adapter but has no feed_url or paid_feed_url",
                    host.name
                )));
            }
            for novel_ref in host.all_novels() {
                if novel_ref.novel.title.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "Host '{}' has a novel without a title",
                        host.name
                    )));
                }
                if let Some(t) = novel_ref.novel.pub_time_override {
                    if t.hour > 23 || t.minute > 59 || t.second > 59 {
                        return Err(AppError::validation(format!(
                            "Novel '{}' has an invalid pub_time_override",
                            novel_ref.novel.title
                        )));
                    }
                }
                let novel_id = novel_ref.novel_id();
                if !novel_ids.insert(novel_id.clone()) {
                    return Err(AppError::validation(format!(
                        "Duplicate novel id '{novel_id}'"
                    )));
                }
                let stem = novel_ref.history_stem().to_lowercase();
                if let Some(other) = history_stems.insert(stem, novel_id.clone()) {
                    return Err(AppError::validation(format!(
                        "Novels '{}' and '{}' share the history file '{}.json'",
                        other,
                        novel_id,
                        novel_ref.history_stem()
                    )));
                }
            }
        }
        Ok(())
    }

    /// All configured novels with their host context.
    pub fn all_novels(&self) -> Vec<NovelRef<'_>> {
        self.hosts.iter().flat_map(|h| h.all_novels()).collect()
    }

    /// Find a host by name (case-insensitive).
    pub fn find_host(&self, name: &str) -> Option<&HostConfig> {
        let wanted = name.trim().to_lowercase();
        self.hosts
            .iter()
            .find(|h| h.name.trim().to_lowercase() == wanted)
    }

    /// Directory holding per-novel history documents.
    pub fn history_dir(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.output.history_dir)
    }

    /// Path of the operator override document.
    pub fn overrides_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.output.overrides_file)
    }

    /// Path of the rendered feed for a kind.
    pub fn feed_path(&self, storage_dir: &Path, kind: FeedKind) -> PathBuf {
        let file = match kind {
            FeedKind::Free => &self.output.free_file,
            FeedKind::Paid => &self.output.paid_file,
        };
        storage_dir.join(&self.output.dir).join(file)
    }

    /// Path of the rendered comments feed.
    pub fn comments_feed_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.output.dir).join(&self.output.comments_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            merge: MergeConfig::default(),
            output: OutputConfig::default(),
            hosts: defaults::default_hosts(),
        }
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent listing fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Merge and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Days an absent-but-previously-seen chapter stays published
    #[serde(default = "defaults::window_days")]
    pub window_days: i64,

    /// Share of malformed entries (0-100) above which a scrape is rejected
    #[serde(default = "defaults::max_malformed_percent")]
    pub max_malformed_percent: u8,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            window_days: defaults::window_days(),
            max_malformed_percent: defaults::max_malformed_percent(),
        }
    }
}

/// Feed output and storage layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Feed output directory, relative to the storage directory
    #[serde(default = "defaults::output_dir")]
    pub dir: String,

    /// History directory, relative to the storage directory
    #[serde(default = "defaults::history_dir")]
    pub history_dir: String,

    /// Override document, relative to the storage directory
    #[serde(default = "defaults::overrides_file")]
    pub overrides_file: String,

    #[serde(default = "defaults::free_file")]
    pub free_file: String,

    #[serde(default = "defaults::paid_file")]
    pub paid_file: String,

    #[serde(default = "defaults::comments_file")]
    pub comments_file: String,

    #[serde(default = "defaults::feed_link")]
    pub feed_link: String,

    #[serde(default = "defaults::free_title")]
    pub free_title: String,

    #[serde(default = "defaults::paid_title")]
    pub paid_title: String,

    #[serde(default = "defaults::comments_title")]
    pub comments_title: String,

    /// Extra role mention appended to NSFW items
    #[serde(default)]
    pub nsfw_role_mention: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: defaults::output_dir(),
            history_dir: defaults::history_dir(),
            overrides_file: defaults::overrides_file(),
            free_file: defaults::free_file(),
            paid_file: defaults::paid_file(),
            comments_file: defaults::comments_file(),
            feed_link: defaults::feed_link(),
            free_title: defaults::free_title(),
            paid_title: defaults::paid_title(),
            comments_title: defaults::comments_title(),
            nsfw_role_mention: String::new(),
        }
    }
}

impl OutputConfig {
    pub fn title(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::Free => &self.free_title,
            FeedKind::Paid => &self.paid_title,
        }
    }
}

mod defaults {
    use crate::models::{AdapterKind, HostConfig, ListingSelectors, NovelConfig, TimeOfDay};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; chapter-feeds/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        8
    }

    // Merge defaults
    pub fn window_days() -> i64 {
        7
    }
    pub fn max_malformed_percent() -> u8 {
        50
    }

    // Output defaults
    pub fn output_dir() -> String {
        "feeds".into()
    }
    pub fn history_dir() -> String {
        "history".into()
    }
    pub fn overrides_file() -> String {
        "overrides.json".into()
    }
    pub fn free_file() -> String {
        "free_chapters_feed.xml".into()
    }
    pub fn paid_file() -> String {
        "paid_chapters_feed.xml".into()
    }
    pub fn comments_file() -> String {
        "aggregated_comments_feed.xml".into()
    }
    pub fn feed_link() -> String {
        "https://example.com/feeds/".into()
    }
    pub fn free_title() -> String {
        "Aggregated Free Chapters Feed".into()
    }
    pub fn paid_title() -> String {
        "Aggregated Paid Chapters Feed".into()
    }
    pub fn comments_title() -> String {
        "Aggregated Comments Feed".into()
    }

    // Host defaults
    pub fn default_hosts() -> Vec<HostConfig> {
        vec![HostConfig {
            name: "Dragonholic".to_string(),
            adapter: AdapterKind::HtmlListing,
            translator: "Cannibal Turtle".to_string(),
            logo_url: "https://dragonholic.com/wp-content/uploads/2025/01/Web-Logo-White.png"
                .to_string(),
            coin_glyph: "🔥".to_string(),
            feed_url: Some("https://dragonholic.com/feed/manga-chapters/".to_string()),
            paid_feed_url: None,
            comments_feed_url: Some("https://dragonholic.com/comments/feed/".to_string()),
            selectors: ListingSelectors::default(),
            novels: vec![NovelConfig {
                title: "Quick Transmigration: The Villain Is Too Pampered and Alluring"
                    .to_string(),
                url: "https://dragonholic.com/novel/quick-transmigration-the-villain-is-too-pampered-and-alluring/"
                    .to_string(),
                short_code: Some("tvitpa".to_string()),
                history_file: None,
                role_mention: String::new(),
                featured_image: String::new(),
                nsfw: false,
                pub_time_override: Some(TimeOfDay {
                    hour: 12,
                    minute: 0,
                    second: 0,
                }),
                custom_description: None,
                free: true,
                paid: true,
            }],
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_window() {
        let mut config = Config::default();
        config.merge.window_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_novels() {
        let mut config = Config::default();
        let novel = config.hosts[0].novels[0].clone();
        config.hosts[0].novels.push(novel);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_shared_history_file() {
        let mut config = Config::default();
        let mut second = config.hosts[0].novels[0].clone();
        second.title = "Another Novel".to_string();
        second.history_file = Some("shared.json".to_string());
        config.hosts[0].novels[0].history_file = Some("shared".to_string());
        config.hosts[0].novels.push(second);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_history_file_clashing_with_derived_name() {
        let mut config = Config::default();
        let mut second = config.hosts[0].novels[0].clone();
        second.title = "Another Novel".to_string();
        second.history_file = None;
        config.hosts[0].novels.push(second);
        assert!(config.validate().is_ok());

        config.hosts[0].novels[0].history_file =
            Some("dragonholic__another-novel.json".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_rss_host_without_feed() {
        let mut config = Config::default();
        config.hosts[0].adapter = AdapterKind::Rss;
        config.hosts[0].feed_url = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_minimal_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [merge]
            window_days = 14

            [[hosts]]
            name = "Example Host"
            adapter = "rss"
            feed_url = "https://example.com/feed"

            [[hosts.novels]]
            title = "Example Novel"
            url = "https://example.com/novel/example/"
            pub_time_override = { hour = 12 }
            "#,
        )
        .unwrap();

        assert_eq!(config.merge.window_days, 14);
        assert_eq!(config.merge.max_malformed_percent, 50);
        assert_eq!(config.crawler.max_concurrent, 8);
        assert_eq!(config.hosts.len(), 1);
        assert_eq!(config.hosts[0].selectors, crate::models::ListingSelectors::default());
        let override_time = config.hosts[0].novels[0].pub_time_override.unwrap();
        assert_eq!((override_time.hour, override_time.minute), (12, 0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn feed_paths_are_under_storage_dir() {
        let config = Config::default();
        let base = Path::new("/data");
        assert_eq!(
            config.feed_path(base, FeedKind::Paid),
            PathBuf::from("/data/feeds/paid_chapters_feed.xml")
        );
        assert_eq!(
            config.comments_feed_path(base),
            PathBuf::from("/data/feeds/aggregated_comments_feed.xml")
        );
        assert_eq!(config.history_dir(base), PathBuf::from("/data/history"));
        assert_eq!(
            config.overrides_path(base),
            PathBuf::from("/data/overrides.json")
        );
    }
}
