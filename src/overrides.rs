//! Operator-maintained chapter overrides.
//!
//! Lets an operator publish chapters a host adapter cannot see (manual hosts,
//! broken listings). Entries are appended to the matching novel's scrape and
//! go through normalization and merge like any scraped entry.
//!
//! ```json
//! { "entries": [ { "host": "Mistmint Haven", "novel": "…", "chapter_name": "Chapter 12",
//!                  "published_at": "2025-05-22T12:00:00Z", "price": "5" } ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Config, FeedKind, NovelRef, RawEntry, TitleParts};
use crate::pipeline::normalize::parse_absolute;

/// One manually published chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub host: String,

    /// Novel title as configured
    pub novel: String,

    pub chapter_name: String,

    #[serde(default)]
    pub name_extension: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    /// Absolute publish time in any supported date format
    pub published_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// Target feed; paid when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed: Option<FeedKind>,
}

impl OverrideEntry {
    pub fn feed_kind(&self) -> FeedKind {
        self.feed.unwrap_or(FeedKind::Paid)
    }

    fn matches(&self, novel: NovelRef<'_>, kind: FeedKind) -> bool {
        self.feed_kind() == kind
            && self.host.trim().eq_ignore_ascii_case(novel.host.name.trim())
            && self.novel.trim() == novel.novel.title.trim()
    }

    fn to_raw(&self, novel: NovelRef<'_>) -> RawEntry {
        let raw_title = if self.name_extension.is_empty() {
            self.chapter_name.clone()
        } else {
            format!("{} - {}", self.chapter_name, self.name_extension)
        };
        RawEntry {
            raw_title,
            link: self.link.clone(),
            date_text: Some(self.published_at.clone()),
            price_text: self.price.clone(),
            token: self.guid.clone(),
            description: self.description.clone(),
            volume: self.volume.clone(),
            title_parts: Some(TitleParts::new(
                novel.novel.title.clone(),
                self.chapter_name.clone(),
                self.name_extension.clone(),
            )),
            ..RawEntry::default()
        }
    }
}

/// The override document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub entries: Vec<OverrideEntry>,
}

impl Overrides {
    /// Load the override document; a missing file means no overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Check every entry against the configuration.
    pub fn validate(&self, config: &Config) -> Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            let at = || format!("overrides entry {} ({} / {})", i, entry.host, entry.novel);
            let host = config
                .find_host(&entry.host)
                .ok_or_else(|| AppError::validation(format!("{}: unknown host", at())))?;
            if host.find_novel(&entry.novel).is_none() {
                return Err(AppError::validation(format!("{}: unknown novel", at())));
            }
            if entry.chapter_name.trim().is_empty() {
                return Err(AppError::validation(format!("{}: empty chapter_name", at())));
            }
            if parse_absolute(&entry.published_at).is_none() {
                return Err(AppError::validation(format!(
                    "{}: unparseable published_at '{}'",
                    at(),
                    entry.published_at
                )));
            }
        }
        Ok(())
    }

    /// Raw entries for one novel and feed.
    pub fn for_novel(&self, novel: NovelRef<'_>, kind: FeedKind) -> Vec<RawEntry> {
        self.entries
            .iter()
            .filter(|e| e.matches(novel, kind))
            .map(|e| e.to_raw(novel))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
