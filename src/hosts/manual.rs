//! Adapter for hosts that are never scraped.
//!
//! Chapters of manual hosts come only from the override document.

use async_trait::async_trait;

use crate::error::Result;
use crate::hosts::HostAdapter;
use crate::models::{FeedKind, NovelRef, RawEntry};

#[derive(Debug, Default, Clone, Copy)]
pub struct ManualAdapter;

impl ManualAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostAdapter for ManualAdapter {
    fn supports(&self, _novel: NovelRef<'_>, _kind: FeedKind) -> bool {
        false
    }

    async fn scrape(&self, _novel: NovelRef<'_>, _kind: FeedKind) -> Result<Vec<RawEntry>> {
        Ok(Vec::new())
    }
}
