//! Raw entries as produced by host adapters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::TitleParts;

/// One chapter entry scraped from a host listing, before normalization.
///
/// All fields are best-effort; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Title text exactly as the host shows it
    pub raw_title: String,

    #[serde(default)]
    pub link: Option<String>,

    /// Absolute date or relative phrase ("3 hours ago")
    #[serde(default)]
    pub date_text: Option<String>,

    /// Price/coin marker; absent for free chapters
    #[serde(default)]
    pub price_text: Option<String>,

    /// CSS classes of the listing element
    #[serde(default)]
    pub dom_marker_class: BTreeSet<String>,

    /// Host-provided chapter identity, if the source has one
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub volume: Option<String>,

    /// Already-split title from sources with structured fields
    #[serde(default)]
    pub title_parts: Option<TitleParts>,
}

impl RawEntry {
    pub fn new(raw_title: impl Into<String>) -> Self {
        Self {
            raw_title: raw_title.into(),
            ..Self::default()
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_date(mut self, date_text: impl Into<String>) -> Self {
        self.date_text = Some(date_text.into());
        self
    }

    pub fn with_price(mut self, price_text: impl Into<String>) -> Self {
        self.price_text = Some(price_text.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.dom_marker_class.insert(class.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    pub fn with_title_parts(mut self, parts: TitleParts) -> Self {
        self.title_parts = Some(parts);
        self
    }

    /// Link with surrounding whitespace removed; `None` when empty or a
    /// placeholder anchor.
    pub fn usable_link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "#")
    }

    /// Chapter token carried in a marker class such as `data-chapter-1201`.
    pub fn class_token(&self, prefix: &str) -> Option<&str> {
        self.dom_marker_class
            .iter()
            .find_map(|c| c.strip_prefix(prefix))
            .filter(|t| !t.is_empty())
    }
}
