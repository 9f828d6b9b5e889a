// src/models/host.rs

//! Host and novel configuration structures.

use serde::{Deserialize, Serialize};

use crate::models::{FeedKind, ListingSelectors};
use crate::utils::slugify;

/// Which adapter implementation scrapes a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// HTML chapter listing scraped with CSS selectors
    #[default]
    HtmlListing,
    /// Host-wide RSS/Atom feed
    Rss,
    /// Not scraped; chapters come from the override document only
    Manual,
}

/// Forced time of day for published timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

/// A publisher website hosting one or more novels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host display name (e.g., "Dragonholic")
    pub name: String,

    #[serde(default)]
    pub adapter: AdapterKind,

    /// Translator account name on this host
    #[serde(default)]
    pub translator: String,

    #[serde(default)]
    pub logo_url: String,

    /// Glyph prefixed to price tokens in the paid feed
    #[serde(default)]
    pub coin_glyph: String,

    /// Site-wide feed of free chapters (RSS adapter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,

    /// Site-wide feed of paid chapters (RSS adapter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_feed_url: Option<String>,

    /// Site-wide feed of reader comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments_feed_url: Option<String>,

    /// Listing selectors (HTML adapter)
    #[serde(default)]
    pub selectors: ListingSelectors,

    #[serde(default)]
    pub novels: Vec<NovelConfig>,
}

impl HostConfig {
    /// Get all novels with their host context.
    pub fn all_novels(&self) -> Vec<NovelRef<'_>> {
        self.novels
            .iter()
            .map(|novel| NovelRef { host: self, novel })
            .collect()
    }

    /// Find a novel by its display title.
    pub fn find_novel(&self, title: &str) -> Option<&NovelConfig> {
        let wanted = title.trim();
        self.novels.iter().find(|n| n.title.trim() == wanted)
    }
}

/// A novel tracked on a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelConfig {
    /// Title exactly as the host displays it
    pub title: String,

    /// Series page URL
    pub url: String,

    /// Short code used to build fallback chapter ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_code: Option<String>,

    /// History file name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_file: Option<String>,

    /// Role mention token for notification bots
    #[serde(default)]
    pub role_mention: String,

    #[serde(default)]
    pub featured_image: String,

    /// Whole novel is NSFW regardless of chapter labels
    #[serde(default)]
    pub nsfw: bool,

    /// Forced time of day for paid chapter timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_time_override: Option<TimeOfDay>,

    /// Replaces the scraped description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_description: Option<String>,

    #[serde(default = "default_true")]
    pub free: bool,

    #[serde(default = "default_true")]
    pub paid: bool,
}

fn default_true() -> bool {
    true
}

impl NovelConfig {
    /// Prefix for fallback guids: the configured short code or the title slug.
    pub fn guid_prefix(&self) -> String {
        self.short_code
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&self.title))
    }

    /// Whether this novel participates in the given feed.
    pub fn in_feed(&self, kind: FeedKind) -> bool {
        match kind {
            FeedKind::Free => self.free,
            FeedKind::Paid => self.paid,
        }
    }
}

/// Reference to a novel with its host context.
#[derive(Debug, Clone, Copy)]
pub struct NovelRef<'a> {
    pub host: &'a HostConfig,
    pub novel: &'a NovelConfig,
}

impl NovelRef<'_> {
    /// Stable novel identifier: `host-slug/title-slug`.
    pub fn novel_id(&self) -> String {
        format!("{}/{}", slugify(&self.host.name), slugify(&self.novel.title))
    }

    /// File stem of the novel's history document.
    ///
    /// The configured `history_file` without its `.json` extension, else the
    /// novel id with `/` replaced by `__`.
    pub fn history_stem(&self) -> String {
        match self.novel.history_file.as_deref().map(str::trim) {
            Some(file) if !file.is_empty() => {
                file.strip_suffix(".json").unwrap_or(file).to_string()
            }
            _ => self.novel_id().replace('/', "__"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_host() -> HostConfig {
        toml::from_str(
            r#"
            name = "Mistmint Haven"
            adapter = "manual"
            translator = "CannibalTurtle"

            [[novels]]
            title = "[Quick Transmigration] The Delicate Little Beauty"
            url = "https://www.mistminthaven.com/novels/delicate-little-beauty"
            short_code = "tdlbkgc"
            free = false

            [[novels]]
            title = "Second Novel"
            url = "https://www.mistminthaven.com/novels/second"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_all_novels_and_ids() {
        let host = create_test_host();
        let refs = host.all_novels();
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[0].novel_id(),
            "mistmint-haven/quick-transmigration-the-delicate-little-beauty"
        );
        assert_eq!(refs[1].novel_id(), "mistmint-haven/second-novel");
    }

    #[test]
    fn test_guid_prefix() {
        let host = create_test_host();
        assert_eq!(host.novels[0].guid_prefix(), "tdlbkgc");
        assert_eq!(host.novels[1].guid_prefix(), "second-novel");
    }

    #[test]
    fn test_feed_membership_defaults() {
        let host = create_test_host();
        assert_eq!(host.adapter, AdapterKind::Manual);
        assert!(!host.novels[0].in_feed(FeedKind::Free));
        assert!(host.novels[0].in_feed(FeedKind::Paid));
        assert!(host.novels[1].in_feed(FeedKind::Free));
    }

    #[test]
    fn test_find_novel() {
        let host = create_test_host();
        assert!(host.find_novel(" Second Novel ").is_some());
        assert!(host.find_novel("Missing").is_none());
    }
}
