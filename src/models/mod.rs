// src/models/mod.rs

//! Domain models for the feed builder.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod chapter;
mod comment;
mod config;
mod host;
mod raw;
mod selectors;

// Re-export all public types
pub use chapter::{Category, ChapterKey, ChapterRecord, TimeSource, TitleParts};
pub use comment::{CommentRecord, RawComment};
pub use config::{Config, CrawlerConfig, MergeConfig, OutputConfig};
pub use host::{AdapterKind, HostConfig, NovelConfig, NovelRef, TimeOfDay};
pub use raw::RawEntry;
pub use selectors::ListingSelectors;

use serde::{Deserialize, Serialize};

/// Which published feed a run builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Free,
    Paid,
}

impl FeedKind {
    pub const ALL: [FeedKind; 2] = [FeedKind::Free, FeedKind::Paid];

    /// Paid listings drop old chapters without notice, so only they are
    /// reconciled against persisted history.
    pub fn uses_history(self) -> bool {
        matches!(self, FeedKind::Paid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Free => "free",
            FeedKind::Paid => "paid",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedKind {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(FeedKind::Free),
            "paid" => Ok(FeedKind::Paid),
            other => Err(crate::error::AppError::validation(format!(
                "unknown feed kind '{other}' (expected 'free' or 'paid')"
            ))),
        }
    }
}
