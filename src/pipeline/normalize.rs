//! Raw entry to canonical chapter record.
//!
//! Normalization never fails on a bad date: unparseable or missing dates fall
//! back to the scrape time and the record is flagged [`TimeSource::Fallback`].
//! Only an entry with neither a usable link nor a chapter label is rejected.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::hosts::HostAdapter;
use crate::models::{
    Category, ChapterKey, ChapterRecord, FeedKind, NovelRef, RawEntry, TimeSource, TitleParts,
};
use crate::utils::url::volume_from_link;
use crate::utils::{collapse_whitespace, resolve, slugify};

static NUMBER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").ok());

static RELATIVE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(minute|min|hour|day|week)s?\s+ago$").ok()
});

static PLAIN_CHAPTER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:chapter|ch\.?|episode|ep\.?)\s*(\d+(?:\.\d+)?)$").ok()
});

static NSFW_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^\p{L}\p{N}])(?:bonus h chapter|extended nsfw|nsfw scene|nsfw|r-18\+|r-18|r18|18\+|hhh|hh|h)(?:$|[^\p{L}\p{N}])",
    )
    .ok()
});

/// Date formats tried after RFC 3339 and RFC 2822, all read as UTC.
const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Everything normalization needs to know besides the entry itself.
pub struct NormalizeContext<'a> {
    pub novel: NovelRef<'a>,
    pub kind: FeedKind,
    pub adapter: &'a dyn HostAdapter,
}

/// Result of normalizing one novel's scrape.
#[derive(Debug, Default)]
pub struct NormalizeBatch {
    pub records: Vec<ChapterRecord>,
    pub malformed: Vec<AppError>,
}

impl NormalizeBatch {
    pub fn total(&self) -> usize {
        self.records.len() + self.malformed.len()
    }
}

/// Normalize every entry, collecting rejects instead of failing the batch.
pub fn normalize_all(
    raws: &[RawEntry],
    ctx: &NormalizeContext<'_>,
    now: DateTime<Utc>,
) -> NormalizeBatch {
    let mut batch = NormalizeBatch::default();
    for raw in raws {
        match normalize(raw, ctx, now) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                log::debug!("Skipping entry: {}", e);
                batch.malformed.push(e);
            }
        }
    }
    batch
}

/// Turn one raw entry into a chapter record.
pub fn normalize(
    raw: &RawEntry,
    ctx: &NormalizeContext<'_>,
    now: DateTime<Utc>,
) -> Result<ChapterRecord> {
    let host = ctx.novel.host;
    let novel = ctx.novel.novel;

    let title_parts = match &raw.title_parts {
        Some(parts) => parts.clone(),
        None => ctx.adapter.split_title(&novel.title, &raw.raw_title),
    };
    let chapter_name = title_parts.chapter_name.trim();

    let link = match raw.usable_link() {
        Some(href) => resolve(&novel.url, href),
        None if !chapter_name.is_empty() => {
            synthesize_link(&novel.url, raw.volume.as_deref(), chapter_name)
        }
        None => {
            return Err(AppError::malformed(
                raw.raw_title.clone(),
                "no usable link and no chapter label",
            ));
        }
    };

    let (mut published_at, time_source) = resolve_publish_time(raw.date_text.as_deref(), now);
    if time_source == TimeSource::Fallback {
        log::warn!(
            "No parseable date for '{}' ({:?}); using scrape time",
            raw.raw_title,
            raw.date_text
        );
    }
    if ctx.kind == FeedKind::Paid && time_source != TimeSource::Fallback {
        if let Some(t) = novel.pub_time_override {
            if let Some(forced) = published_at
                .date_naive()
                .and_hms_opt(t.hour, t.minute, t.second)
            {
                published_at = forced.and_utc();
            }
        }
    }

    let guid = derive_guid(raw, ctx, chapter_name, &link);

    let category = if novel.nsfw || is_nsfw(&title_parts) {
        Category::Nsfw
    } else {
        Category::Sfw
    };

    let description = novel
        .custom_description
        .as_deref()
        .or(raw.description.as_deref())
        .map(collapse_whitespace)
        .unwrap_or_default();

    let price_marker = match ctx.kind {
        FeedKind::Free => String::new(),
        FeedKind::Paid => raw
            .price_text
            .as_deref()
            .map(collapse_whitespace)
            .unwrap_or_default(),
    };

    let volume = raw
        .volume
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| volume_from_link(&link));

    Ok(ChapterRecord {
        novel_id: ctx.novel.novel_id(),
        guid,
        chapter_key: chapter_key(chapter_name),
        title_parts: TitleParts::new(
            collapse_whitespace(&title_parts.main_title),
            collapse_whitespace(chapter_name),
            collapse_whitespace(&title_parts.name_extension),
        ),
        published_at,
        time_source,
        link,
        description,
        price_marker,
        category,
        volume,
        host: host.name.clone(),
        translator: host.translator.clone(),
    })
}

/// Numeric sort key of a chapter label; labels without digits are chapter zero.
pub fn chapter_key(label: &str) -> ChapterKey {
    let Some(re) = NUMBER_RE.as_ref() else {
        return ChapterKey::zero();
    };
    let parts = re
        .find_iter(label)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();
    ChapterKey::new(parts)
}

/// Whether a chapter's labels carry an adult-content marker.
pub fn is_nsfw(parts: &TitleParts) -> bool {
    let text = format!("{} {}", parts.chapter_name, parts.name_extension);
    NSFW_RE.as_ref().is_some_and(|re| re.is_match(&text))
}

/// Resolve a date string to a timestamp and its confidence.
pub fn resolve_publish_time(
    date_text: Option<&str>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, TimeSource) {
    let Some(text) = date_text.map(str::trim).filter(|t| !t.is_empty()) else {
        return (now, TimeSource::Fallback);
    };
    if let Some(dt) = parse_absolute(text) {
        return (dt, TimeSource::Absolute);
    }
    if let Some(dt) = parse_relative(text, now) {
        return (dt, TimeSource::Relative);
    }
    (now, TimeSource::Fallback)
}

/// Parse an absolute date; date-only forms resolve to midnight UTC.
pub fn parse_absolute(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.and_utc());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse `"N minute|hour|day|week(s) ago"` relative to `now`.
pub fn parse_relative(phrase: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let phrase = collapse_whitespace(phrase);
    let caps = RELATIVE_RE.as_ref()?.captures(&phrase)?;
    let n: i64 = caps.get(1)?.as_str().parse().ok()?;
    let delta = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "minute" | "min" => TimeDelta::try_minutes(n)?,
        "hour" => TimeDelta::try_hours(n)?,
        "day" => TimeDelta::try_days(n)?,
        "week" => TimeDelta::try_weeks(n)?,
        _ => return None,
    };
    now.checked_sub_signed(delta)
}

fn derive_guid(
    raw: &RawEntry,
    ctx: &NormalizeContext<'_>,
    chapter_name: &str,
    link: &str,
) -> String {
    let host_token = raw
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| raw.class_token(&ctx.novel.host.selectors.token_class_prefix));
    if let Some(token) = host_token {
        return token.to_string();
    }

    let prefix = ctx.novel.novel.guid_prefix();
    let plain_number = PLAIN_CHAPTER_RE
        .as_ref()
        .and_then(|re| re.captures(chapter_name))
        .and_then(|caps| caps.get(1));
    if let Some(n) = plain_number {
        return format!("{}-{}", prefix, n.as_str());
    }

    let label_slug = slugify(chapter_name);
    if !label_slug.is_empty() {
        return format!("{prefix}-{label_slug}");
    }

    let digest = hex::encode(Sha256::digest(link.as_bytes()));
    digest[..16].to_string()
}

fn synthesize_link(novel_url: &str, volume: Option<&str>, chapter_name: &str) -> String {
    let mut link = novel_url.trim().to_string();
    if !link.ends_with('/') {
        link.push('/');
    }
    if let Some(vol) = volume.map(slugify).filter(|v| !v.is_empty()) {
        link.push_str(&vol);
        link.push('/');
    }
    link.push_str(&slugify(chapter_name));
    link.push('/');
    link
}
