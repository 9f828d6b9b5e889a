// src/models/selectors.rs

//! CSS selectors for scraping a chapter listing page.

use serde::{Deserialize, Serialize};

/// CSS selectors and marker classes for an HTML chapter listing.
///
/// Defaults match the Madara WordPress theme used by several hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each chapter row in the listing
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Selector for the title/link element within a row
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Selector for the release date within a row
    #[serde(default = "defaults::date_selector")]
    pub date_selector: String,

    /// Selector for the price marker within a row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_selector: Option<String>,

    /// Selector for the novel summary on the listing page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,

    /// Selector for a volume group enclosing chapter rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_selector: Option<String>,

    /// Selector for the volume label within a volume group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_label_selector: Option<String>,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "defaults::attr_name")]
    pub attr_name: String,

    /// Row class marking a premium chapter
    #[serde(default = "defaults::premium_class")]
    pub premium_class: String,

    /// Row class marking a free chapter
    #[serde(default = "defaults::free_class")]
    pub free_class: String,

    /// Row class prefix carrying the host's chapter id
    #[serde(default = "defaults::token_class_prefix")]
    pub token_class_prefix: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            title_selector: defaults::title_selector(),
            date_selector: defaults::date_selector(),
            price_selector: Some("span.coin".to_string()),
            description_selector: Some("div.description-summary".to_string()),
            volume_selector: Some("li.parent.has-child".to_string()),
            volume_label_selector: Some("a.has-child".to_string()),
            attr_name: defaults::attr_name(),
            premium_class: defaults::premium_class(),
            free_class: defaults::free_class(),
            token_class_prefix: defaults::token_class_prefix(),
        }
    }
}

mod defaults {
    pub fn row_selector() -> String {
        "li.wp-manga-chapter".into()
    }
    pub fn title_selector() -> String {
        "a".into()
    }
    pub fn date_selector() -> String {
        "span.chapter-release-date i".into()
    }
    pub fn attr_name() -> String {
        "href".into()
    }
    pub fn premium_class() -> String {
        "premium".into()
    }
    pub fn free_class() -> String {
        "free-chap".into()
    }
    pub fn token_class_prefix() -> String {
        "data-chapter-".into()
    }
}
