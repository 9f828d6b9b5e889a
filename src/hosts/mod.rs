//! Host adapters.
//!
//! Each host website gets an adapter that knows how to fetch a novel's chapter
//! listing and how the host formats chapter titles. Adapters are selected by
//! host name through [`HostRegistry`].

pub mod comments;
pub mod html_listing;
pub mod manual;
pub mod rss;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{AdapterKind, Config, FeedKind, NovelRef, RawEntry, TitleParts};
use crate::utils::collapse_whitespace;

pub use comments::{CommentSource, FeedCommentSource};
pub use html_listing::HtmlListingAdapter;
pub use manual::ManualAdapter;
pub use rss::RssAdapter;

/// Per-host scraping capability.
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Whether this adapter can produce entries for a feed kind.
    fn supports(&self, novel: NovelRef<'_>, kind: FeedKind) -> bool;

    /// Fetch the raw chapter entries of one novel.
    async fn scrape(&self, novel: NovelRef<'_>, kind: FeedKind) -> Result<Vec<RawEntry>>;

    /// Split a host title into its parts.
    fn split_title(&self, novel_title: &str, raw_title: &str) -> TitleParts {
        split_chapter_label(novel_title, raw_title)
    }
}

/// Adapters keyed by host name (case-insensitive).
#[derive(Default, Clone)]
pub struct HostRegistry {
    adapters: HashMap<String, Arc<dyn HostAdapter>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one adapter per configured host.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let html: Arc<dyn HostAdapter> = Arc::new(HtmlListingAdapter::new(client.clone()));
        let feed: Arc<dyn HostAdapter> = Arc::new(RssAdapter::new(client));
        let manual: Arc<dyn HostAdapter> = Arc::new(ManualAdapter::new());

        let mut registry = Self::new();
        for host in &config.hosts {
            let adapter = match host.adapter {
                AdapterKind::HtmlListing => Arc::clone(&html),
                AdapterKind::Rss => Arc::clone(&feed),
                AdapterKind::Manual => Arc::clone(&manual),
            };
            registry.register(&host.name, adapter);
        }
        registry
    }

    pub fn register(&mut self, host_name: &str, adapter: Arc<dyn HostAdapter>) {
        self.adapters.insert(Self::key(host_name), adapter);
    }

    pub fn get(&self, host_name: &str) -> Result<Arc<dyn HostAdapter>> {
        self.adapters
            .get(&Self::key(host_name))
            .cloned()
            .ok_or_else(|| AppError::UnknownHost(host_name.to_string()))
    }

    fn key(host_name: &str) -> String {
        host_name.trim().to_lowercase()
    }
}

/// Split a listing label such as `"Chapter 5 - The Return"`.
///
/// The main title is always the configured novel title; a leading copy of it
/// in the label is dropped.
pub fn split_chapter_label(novel_title: &str, raw_title: &str) -> TitleParts {
    let raw = collapse_whitespace(raw_title);
    let novel_title = collapse_whitespace(novel_title);

    let label = raw
        .strip_prefix(novel_title.as_str())
        .map(|rest| rest.trim_start_matches([' ', '-', '–', ':']))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(&raw);

    let (chapter_name, name_extension) = split_once_dash(label);
    TitleParts::new(novel_title, chapter_name, name_extension)
}

/// Split a feed title `"Main Title - Chapter Name - Extension"`.
///
/// Extra dash-separated pieces are joined into the extension; a title with no
/// separator keeps the whole text as the main title.
pub fn split_feed_title(raw_title: &str) -> TitleParts {
    let raw = collapse_whitespace(raw_title);
    let parts: Vec<&str> = raw.split(" - ").map(str::trim).collect();
    match parts.as_slice() {
        [main, chapter] => TitleParts::new(*main, *chapter, ""),
        [main, chapter, rest @ ..] => {
            let extension: Vec<&str> = rest
                .iter()
                .copied()
                .filter(|p| !p.is_empty() && *p != "-")
                .collect();
            TitleParts::new(*main, *chapter, extension.join(" "))
        }
        _ => TitleParts::new(raw.clone(), "", ""),
    }
}

fn split_once_dash(label: &str) -> (String, String) {
    for sep in [" - ", " – "] {
        if let Some((head, tail)) = label.split_once(sep) {
            return (head.trim().to_string(), tail.trim().to_string());
        }
    }
    (label.trim().to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_chapter_label() {
        assert_eq!(
            split_chapter_label("The Villain", "Chapter 5 - The Return"),
            TitleParts::new("The Villain", "Chapter 5", "The Return")
        );
        assert_eq!(
            split_chapter_label("The Villain", "  Chapter   6  "),
            TitleParts::new("The Villain", "Chapter 6", "")
        );
        assert_eq!(
            split_chapter_label("The Villain", "The Villain - Chapter 7 – Dawn"),
            TitleParts::new("The Villain", "Chapter 7", "Dawn")
        );
        assert_eq!(
            split_chapter_label("The Villain", ""),
            TitleParts::new("The Villain", "", "")
        );
    }

    #[test]
    fn test_split_feed_title() {
        assert_eq!(
            split_feed_title("The Villain - Chapter 5"),
            TitleParts::new("The Villain", "Chapter 5", "")
        );
        assert_eq!(
            split_feed_title("The Villain - Chapter 5 - Part A - Part B"),
            TitleParts::new("The Villain", "Chapter 5", "Part A Part B")
        );
        assert_eq!(
            split_feed_title("Announcement"),
            TitleParts::new("Announcement", "", "")
        );
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let config = Config::default();
        let registry = HostRegistry::from_config(&config, reqwest::Client::new());
        assert!(registry.get("dragonholic").is_ok());
        assert!(matches!(
            registry.get("Nowhere"),
            Err(AppError::UnknownHost(_))
        ));
    }
}
