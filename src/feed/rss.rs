//! RSS 2.0 rendering.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Category, ChapterRecord, Config, FeedKind, HostConfig, NovelConfig};

pub(crate) const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Escape text for XML element content and attribute values.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Novel and host settings needed to decorate items.
struct ItemSource<'a> {
    host: &'a HostConfig,
    novel: &'a NovelConfig,
}

/// Render records, already in feed order, as an RSS document.
pub fn render_feed(
    config: &Config,
    kind: FeedKind,
    records: &[ChapterRecord],
    now: DateTime<Utc>,
) -> Result<String> {
    let sources: HashMap<String, ItemSource<'_>> = config
        .all_novels()
        .into_iter()
        .map(|r| {
            (
                r.novel_id(),
                ItemSource {
                    host: r.host,
                    novel: r.novel,
                },
            )
        })
        .collect();

    let mut out = String::new();
    write_document(&mut out, config, kind, records, &sources, now)
        .map_err(|e| AppError::serialization(format!("render {kind} feed: {e}")))?;
    Ok(out)
}

fn write_document(
    out: &mut String,
    config: &Config,
    kind: FeedKind,
    records: &[ChapterRecord],
    sources: &HashMap<String, ItemSource<'_>>,
    now: DateTime<Utc>,
) -> std::fmt::Result {
    let output = &config.output;
    let description = format!("Aggregated RSS feed for {kind} chapters across mapped novels.");
    write_channel_open(out, output.title(kind), &output.feed_link, &description, now)?;
    for record in records {
        write_item(out, config, kind, record, sources.get(&record.novel_id))?;
    }
    write_channel_close(out)
}

/// XML declaration, `<rss>` root and channel metadata.
pub(crate) fn write_channel_open(
    out: &mut String,
    title: &str,
    link: &str,
    description: &str,
    now: DateTime<Utc>,
) -> std::fmt::Result {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(
        out,
        "<rss xmlns:atom=\"http://www.w3.org/2005/Atom\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" version=\"2.0\">"
    )?;
    writeln!(out, "<channel>")?;
    writeln!(out, "  <title>{}</title>", xml_escape(title))?;
    writeln!(out, "  <link>{}</link>", xml_escape(link))?;
    writeln!(out, "  <description>{}</description>", xml_escape(description))?;
    writeln!(out, "  <lastBuildDate>{}</lastBuildDate>", now.format(PUB_DATE_FORMAT))?;
    writeln!(out, "  <generator>chapter-feeds</generator>")
}

pub(crate) fn write_channel_close(out: &mut String) -> std::fmt::Result {
    writeln!(out, "</channel>")?;
    writeln!(out, "</rss>")
}

/// Emphasized name extension as the notification bots expect it.
fn format_name_extension(name_extension: &str) -> String {
    let trimmed = name_extension.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("***{trimmed}***")
    }
}

fn write_item(
    out: &mut String,
    config: &Config,
    kind: FeedKind,
    record: &ChapterRecord,
    source: Option<&ItemSource<'_>>,
) -> std::fmt::Result {
    let role_mention = source.map(|s| s.novel.role_mention.as_str()).unwrap_or("");
    let featured_image = source.map(|s| s.novel.featured_image.as_str()).unwrap_or("");
    let logo_url = source.map(|s| s.host.logo_url.as_str()).unwrap_or("");
    let coin_glyph = source.map(|s| s.host.coin_glyph.as_str()).unwrap_or("");

    let mut roles = role_mention.trim().to_string();
    let nsfw_role = config.output.nsfw_role_mention.trim();
    if record.category == Category::Nsfw && !nsfw_role.is_empty() {
        if !roles.is_empty() {
            roles.push(' ');
        }
        roles.push_str(nsfw_role);
    }

    let t = &record.title_parts;
    writeln!(out, "  <item>")?;
    writeln!(out, "    <title>{}</title>", xml_escape(&t.main_title))?;
    writeln!(out, "    <volume>{}</volume>", xml_escape(&record.volume))?;
    writeln!(out, "    <chaptername>{}</chaptername>", xml_escape(&t.chapter_name))?;
    writeln!(
        out,
        "    <nameextend>{}</nameextend>",
        xml_escape(&format_name_extension(&t.name_extension))
    )?;
    writeln!(out, "    <link>{}</link>", xml_escape(&record.link))?;
    writeln!(
        out,
        "    <description>{}</description>",
        xml_escape(&record.description)
    )?;
    writeln!(out, "    <category>{}</category>", record.category.as_str())?;
    writeln!(out, "    <translator>{}</translator>", xml_escape(&record.translator))?;
    writeln!(out, "    <discord_role_id>{}</discord_role_id>", xml_escape(&roles))?;
    writeln!(out, "    <featuredImage url=\"{}\"/>", xml_escape(featured_image))?;
    if kind == FeedKind::Paid && !record.price_marker.is_empty() {
        let coin = format!("{} {}", coin_glyph, record.price_marker);
        writeln!(out, "    <coin>{}</coin>", xml_escape(coin.trim()))?;
    }
    writeln!(
        out,
        "    <pubDate>{}</pubDate>",
        record.published_at.format(PUB_DATE_FORMAT)
    )?;
    writeln!(out, "    <host>{}</host>", xml_escape(&record.host))?;
    writeln!(out, "    <hostLogo url=\"{}\"/>", xml_escape(logo_url))?;
    writeln!(
        out,
        "    <guid isPermaLink=\"false\">{}</guid>",
        xml_escape(&record.guid)
    )?;
    writeln!(out, "  </item>")
}
