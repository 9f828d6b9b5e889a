//! Reader comments, raw and normalized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, TimeSource};

/// One entry of a host's comments feed, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    /// Feed title, e.g. `"Comment on <novel> by <author>"`
    pub title: String,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub author: String,

    /// Comment HTML, possibly led by an "In reply to" header
    #[serde(default)]
    pub body_html: String,

    /// Feed entry id
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub date_text: Option<String>,
}

impl RawComment {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_body(mut self, body_html: impl Into<String>) -> Self {
        self.body_html = body_html.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_date(mut self, date_text: impl Into<String>) -> Self {
        self.date_text = Some(date_text.into());
        self
    }
}

/// A comment ready for the comments feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub novel_id: String,

    /// Feed entry id, unique across the comments feed
    pub guid: String,

    pub novel_title: String,

    /// Chapter label derived from the comment link, or `Homepage`
    pub chapter: String,

    pub link: String,
    pub author: String,

    /// Plain-text comment body
    pub body: String,

    /// `In reply to <name>` when the comment answers another
    #[serde(default)]
    pub reply_chain: String,

    pub published_at: DateTime<Utc>,

    #[serde(default)]
    pub time_source: TimeSource,

    #[serde(default)]
    pub category: Category,

    pub host: String,

    #[serde(default)]
    pub translator: String,
}
