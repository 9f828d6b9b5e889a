//! Feed output.
//!
//! Renders assembled chapter and comment records as RSS 2.0 documents with
//! the custom per-item elements the notification bots read, and writes them
//! atomically.

pub mod comments;
pub mod rss;

use std::path::Path;

use crate::error::{AppError, Result};
use crate::storage::write_atomic;

pub use comments::render_comments_feed;
pub use rss::{render_feed, xml_escape};

/// Write a rendered feed document atomically.
pub async fn write_feed(path: &Path, xml: &str) -> Result<()> {
    write_atomic(path, xml.as_bytes())
        .await
        .map_err(|e| AppError::serialization(format!("{}: {}", path.display(), e)))?;
    log::info!("Feed written to {:?}", path);
    Ok(())
}
