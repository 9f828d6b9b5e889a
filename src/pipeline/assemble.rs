//! Feed assembly across novels.

use std::cmp::Ordering;

use crate::models::ChapterRecord;

/// Union of per-novel merge outputs in global feed order.
///
/// Newest first; ties fall back to main title, then chapter key descending,
/// then guid. Per-novel order is not preserved.
pub fn assemble(per_novel: Vec<Vec<ChapterRecord>>) -> Vec<ChapterRecord> {
    let mut records: Vec<ChapterRecord> = per_novel.into_iter().flatten().collect();
    records.sort_by(feed_order);
    records
}

fn feed_order(a: &ChapterRecord, b: &ChapterRecord) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.title_parts.main_title.cmp(&b.title_parts.main_title))
        .then_with(|| b.chapter_key.cmp(&a.chapter_key))
        .then_with(|| a.guid.cmp(&b.guid))
}
