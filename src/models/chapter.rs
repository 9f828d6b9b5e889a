//! Chapter record data structures.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered numeric key extracted from a chapter label.
///
/// `"Chapter 12.5"` becomes `(12.5,)`, `"Vol 2 Chapter 10 Part 2"` becomes
/// `(2, 10, 2)`. Keys compare lexicographically, so a shorter key sorts before
/// any longer key it prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterKey(Vec<f64>);

impl ChapterKey {
    /// Build a key; an empty list is "chapter zero".
    pub fn new(parts: Vec<f64>) -> Self {
        if parts.is_empty() {
            Self::zero()
        } else {
            Self(parts)
        }
    }

    /// The key used for labels without any digits.
    pub fn zero() -> Self {
        Self(vec![0.0])
    }

    pub fn parts(&self) -> &[f64] {
        &self.0
    }
}

impl PartialEq for ChapterKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ChapterKey {}

impl PartialOrd for ChapterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChapterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "({},)", parts.join(", "))
    }
}

/// Display title split into its three components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleParts {
    /// Novel title as shown by the host
    pub main_title: String,

    /// Chapter label, e.g. "Chapter 639"
    pub chapter_name: String,

    /// Optional chapter subtitle
    #[serde(default)]
    pub name_extension: String,
}

impl TitleParts {
    pub fn new(
        main_title: impl Into<String>,
        chapter_name: impl Into<String>,
        name_extension: impl Into<String>,
    ) -> Self {
        Self {
            main_title: main_title.into(),
            chapter_name: chapter_name.into(),
            name_extension: name_extension.into(),
        }
    }
}

/// Content rating of a chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    #[default]
    Sfw,
    Nsfw,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sfw => "SFW",
            Category::Nsfw => "NSFW",
        }
    }
}

/// Where a record's publish time came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    /// Parsed from an absolute date string
    #[default]
    Absolute,
    /// Computed from a "N units ago" phrase
    Relative,
    /// Nothing parseable; scrape time was used
    Fallback,
}

impl TimeSource {
    pub fn is_low_confidence(self) -> bool {
        matches!(self, TimeSource::Fallback)
    }
}

/// One published chapter announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Stable novel identifier (`host-slug/title-slug`)
    pub novel_id: String,

    /// Stable per-chapter identity, unique within a novel
    pub guid: String,

    /// Primary sort key within a novel
    pub chapter_key: ChapterKey,

    /// Decomposed display title
    pub title_parts: TitleParts,

    /// Absolute publish time (UTC)
    pub published_at: DateTime<Utc>,

    /// Confidence of `published_at`
    #[serde(default)]
    pub time_source: TimeSource,

    /// Full URL to the chapter
    pub link: String,

    #[serde(default)]
    pub description: String,

    /// Price token; empty for free chapters
    #[serde(default)]
    pub price_marker: String,

    #[serde(default)]
    pub category: Category,

    /// Volume or arc label
    #[serde(default)]
    pub volume: String,

    /// Host display name
    pub host: String,

    #[serde(default)]
    pub translator: String,
}

impl ChapterRecord {
    /// Copy presentation fields from a fresher observation of the same chapter.
    ///
    /// Identity and publish time are never touched.
    pub fn refresh_presentation(&mut self, fresh: &ChapterRecord) {
        self.title_parts = fresh.title_parts.clone();
        self.chapter_key = fresh.chapter_key.clone();
        self.link = fresh.link.clone();
        self.description = fresh.description.clone();
        self.price_marker = fresh.price_marker.clone();
        self.category = fresh.category;
        self.volume = fresh.volume.clone();
        self.host = fresh.host.clone();
        self.translator = fresh.translator.clone();
    }

    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        if self.title_parts.name_extension.is_empty() {
            format!("{} - {}", self.title_parts.main_title, self.title_parts.chapter_name)
        } else {
            format!(
                "{} - {} - {}",
                self.title_parts.main_title,
                self.title_parts.chapter_name,
                self.title_parts.name_extension
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> ChapterRecord {
        ChapterRecord {
            novel_id: "dragonholic/villain".to_string(),
            guid: "1201".to_string(),
            chapter_key: ChapterKey::new(vec![639.0]),
            title_parts: TitleParts::new("Villain", "Chapter 639", "Return"),
            published_at: Utc.with_ymd_and_hms(2025, 5, 22, 12, 0, 0).unwrap(),
            time_source: TimeSource::Absolute,
            link: "https://example.com/novel/villain/chapter-639/".to_string(),
            description: "Summary".to_string(),
            price_marker: "5".to_string(),
            category: Category::Sfw,
            volume: String::new(),
            host: "Dragonholic".to_string(),
            translator: "Turtle".to_string(),
        }
    }

    #[test]
    fn test_chapter_key_ordering() {
        let zero = ChapterKey::zero();
        let one = ChapterKey::new(vec![1.0]);
        let ten = ChapterKey::new(vec![10.0]);
        let ten_part_two = ChapterKey::new(vec![10.0, 2.0]);
        let ten_half = ChapterKey::new(vec![10.5]);

        assert!(zero < one);
        assert!(one < ten);
        assert!(ten < ten_part_two);
        assert!(ten_part_two < ten_half);
        assert_eq!(ChapterKey::new(vec![]), ChapterKey::zero());
    }

    #[test]
    fn test_refresh_keeps_identity_and_time() {
        let mut stored = sample_record();
        let mut fresh = sample_record();
        fresh.published_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        fresh.time_source = TimeSource::Fallback;
        fresh.title_parts.name_extension = "Return (edited)".to_string();
        fresh.price_marker = "3".to_string();

        stored.refresh_presentation(&fresh);

        assert_eq!(stored.guid, "1201");
        assert_eq!(
            stored.published_at,
            Utc.with_ymd_and_hms(2025, 5, 22, 12, 0, 0).unwrap()
        );
        assert_eq!(stored.time_source, TimeSource::Absolute);
        assert_eq!(stored.title_parts.name_extension, "Return (edited)");
        assert_eq!(stored.price_marker, "3");
    }

    #[test]
    fn test_record_json_roundtrip_shape() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["chapter_key"], serde_json::json!([639.0]));
        assert_eq!(json["category"], "SFW");
        assert_eq!(json["time_source"], "absolute");

        let back: ChapterRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
