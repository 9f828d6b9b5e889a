//! Host-wide RSS/Atom chapter feeds.
//!
//! One feed lists recent chapters of every novel on the host; entries are
//! matched to a novel by the main title in front of the first `" - "`.

use async_trait::async_trait;
use feed_rs::parser;

use crate::error::{AppError, Result};
use crate::hosts::{HostAdapter, split_feed_title};
use crate::models::{FeedKind, NovelRef, RawEntry, TitleParts};
use crate::utils::http::{BodyCache, fetch_bytes};

pub struct RssAdapter {
    client: reqwest::Client,
    /// Feed bodies already fetched during this run, by URL
    cache: BodyCache,
}

impl RssAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: BodyCache::new(),
        }
    }

    fn feed_url<'a>(novel: NovelRef<'a>, kind: FeedKind) -> Option<&'a str> {
        match kind {
            FeedKind::Free => novel.host.feed_url.as_deref(),
            FeedKind::Paid => novel.host.paid_feed_url.as_deref(),
        }
    }
}

#[async_trait]
impl HostAdapter for RssAdapter {
    fn supports(&self, novel: NovelRef<'_>, kind: FeedKind) -> bool {
        Self::feed_url(novel, kind).is_some()
    }

    async fn scrape(&self, novel: NovelRef<'_>, kind: FeedKind) -> Result<Vec<RawEntry>> {
        let Some(url) = Self::feed_url(novel, kind) else {
            return Ok(Vec::new());
        };
        let body = self
            .cache
            .get_or_fetch(url, || fetch_bytes(&self.client, url))
            .await
            .map_err(|e| AppError::fetch(novel.novel_id(), e))?;
        parse_feed_entries(&body, &novel.novel.title)
            .map_err(|e| AppError::fetch(novel.novel_id(), e))
    }

    fn split_title(&self, novel_title: &str, raw_title: &str) -> TitleParts {
        let parts = split_feed_title(raw_title);
        if parts.chapter_name.is_empty() {
            TitleParts::new(novel_title, parts.main_title, "")
        } else {
            parts
        }
    }
}

/// Parse a feed document and keep the entries of one novel.
pub fn parse_feed_entries(bytes: &[u8], novel_title: &str) -> Result<Vec<RawEntry>> {
    let feed = parser::parse(bytes)
        .map_err(|e| AppError::validation(format!("failed to parse feed: {e}")))?;
    let wanted = novel_title.trim().to_lowercase();

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let main_title = split_feed_title(&title).main_title.to_lowercase();
            if main_title != wanted {
                return None;
            }
            Some(RawEntry {
                raw_title: title,
                link: entry.links.first().map(|l| l.href.clone()),
                date_text: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
                token: Some(entry.id).filter(|id| !id.trim().is_empty()),
                description: entry
                    .summary
                    .map(|t| t.content)
                    .or(entry.content.and_then(|c| c.body)),
                ..RawEntry::default()
            })
        })
        .collect();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>Dragonholic Chapters</title>
            <link>https://dragonholic.com</link>
            <description>Latest chapters</description>
            <item>
              <title>The Villain - Chapter 640 - Homecoming</title>
              <link>https://dragonholic.com/novel/the-villain/chapter-640/</link>
              <guid isPermaLink="false">dh-640</guid>
              <pubDate>Thu, 22 May 2025 10:00:00 +0000</pubDate>
              <description>New chapter</description>
            </item>
            <item>
              <title>Another Novel - Chapter 3</title>
              <link>https://dragonholic.com/novel/another/chapter-3/</link>
              <guid isPermaLink="false">an-3</guid>
              <pubDate>Thu, 22 May 2025 09:00:00 +0000</pubDate>
            </item>
            <item>
              <title>the villain - Chapter 639</title>
              <link>https://dragonholic.com/novel/the-villain/chapter-639/</link>
              <guid isPermaLink="false">dh-639</guid>
              <pubDate>Wed, 21 May 2025 10:00:00 +0000</pubDate>
            </item>
          </channel>
        </rss>"#;

    #[test]
    fn test_parse_feed_filters_by_novel() {
        let entries = parse_feed_entries(FEED.as_bytes(), "The Villain").unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.raw_title, "The Villain - Chapter 640 - Homecoming");
        assert_eq!(
            first.link.as_deref(),
            Some("https://dragonholic.com/novel/the-villain/chapter-640/")
        );
        assert_eq!(first.token.as_deref(), Some("dh-640"));
        assert_eq!(first.date_text.as_deref(), Some("2025-05-22T10:00:00+00:00"));
        assert_eq!(first.description.as_deref(), Some("New chapter"));
        assert_eq!(entries[1].token.as_deref(), Some("dh-639"));
    }

    #[test]
    fn test_parse_invalid_feed() {
        assert!(parse_feed_entries(b"not a feed", "The Villain").is_err());
    }

    #[test]
    fn test_split_title_uses_feed_layout() {
        let adapter = RssAdapter::new(reqwest::Client::new());
        assert_eq!(
            adapter.split_title("The Villain", "The Villain - Chapter 640 - Homecoming"),
            TitleParts::new("The Villain", "Chapter 640", "Homecoming")
        );
        assert_eq!(
            adapter.split_title("The Villain", "Chapter 641"),
            TitleParts::new("The Villain", "Chapter 641", "")
        );
    }
}
