//! Comments feed rendering.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::feed::rss::{PUB_DATE_FORMAT, write_channel_close, write_channel_open, xml_escape};
use crate::models::{CommentRecord, Config, HostConfig, NovelConfig};

/// Prefix the notification bots show before a reply chain.
const REPLY_MARKER: &str = "ᯓ✿ ";

/// Render comment records, already in feed order, as an RSS document.
pub fn render_comments_feed(
    config: &Config,
    records: &[CommentRecord],
    now: DateTime<Utc>,
) -> Result<String> {
    let novels: HashMap<String, (&HostConfig, &NovelConfig)> = config
        .all_novels()
        .into_iter()
        .map(|r| (r.novel_id(), (r.host, r.novel)))
        .collect();

    let mut out = String::new();
    write_document(&mut out, config, records, &novels, now)
        .map_err(|e| AppError::serialization(format!("render comments feed: {e}")))?;
    Ok(out)
}

fn write_document(
    out: &mut String,
    config: &Config,
    records: &[CommentRecord],
    novels: &HashMap<String, (&HostConfig, &NovelConfig)>,
    now: DateTime<Utc>,
) -> std::fmt::Result {
    let output = &config.output;
    let description = "Aggregated RSS feed for reader comments across mapped novels.";
    write_channel_open(out, &output.comments_title, &output.feed_link, description, now)?;
    for record in records {
        write_comment(out, record, novels.get(&record.novel_id).copied())?;
    }
    write_channel_close(out)
}

fn write_comment(
    out: &mut String,
    record: &CommentRecord,
    source: Option<(&HostConfig, &NovelConfig)>,
) -> std::fmt::Result {
    let role_mention = source.map(|(_, n)| n.role_mention.trim()).unwrap_or("");
    let featured_image = source.map(|(_, n)| n.featured_image.as_str()).unwrap_or("");
    let logo_url = source.map(|(h, _)| h.logo_url.as_str()).unwrap_or("");

    writeln!(out, "  <item>")?;
    writeln!(out, "    <title>{}</title>", xml_escape(&record.novel_title))?;
    writeln!(out, "    <chapter>{}</chapter>", xml_escape(&record.chapter))?;
    writeln!(out, "    <link>{}</link>", xml_escape(&record.link))?;
    writeln!(out, "    <dc:creator>{}</dc:creator>", xml_escape(&record.author))?;
    writeln!(out, "    <description>{}</description>", xml_escape(&record.body))?;
    if !record.reply_chain.is_empty() {
        let chain = format!("{REPLY_MARKER}{}", record.reply_chain);
        writeln!(out, "    <reply_chain>{}</reply_chain>", xml_escape(&chain))?;
    }
    writeln!(out, "    <category>{}</category>", record.category.as_str())?;
    writeln!(out, "    <translator>{}</translator>", xml_escape(&record.translator))?;
    writeln!(out, "    <discord_role_id>{}</discord_role_id>", xml_escape(role_mention))?;
    writeln!(out, "    <featuredImage url=\"{}\"/>", xml_escape(featured_image))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TimeSource};
    use chrono::TimeZone;

    fn config() -> Config {
        toml::from_str(
            r#"
            [output]
            nsfw_role_mention = "<@&999>"

            [[hosts]]
            name = "Dragonholic"
            translator = "Turtle"
            logo_url = "https://dragonholic.com/logo.png"

            [[hosts.novels]]
            title = "The Villain"
            url = "https://dragonholic.com/novel/the-villain/"
            role_mention = "<@&123>"
            featured_image = "https://dragonholic.com/cover.jpg"
            "#,
        )
        .unwrap()
    }

    fn record(guid: &str, reply_chain: &str) -> CommentRecord {
        CommentRecord {
            novel_id: "dragonholic/the-villain".to_string(),
            guid: guid.to_string(),
            novel_title: "The Villain".to_string(),
            chapter: "Chapter 12".to_string(),
            link: "https://dragonholic.com/novel/the-villain/chapter-12/#comment-41".to_string(),
            author: "Reader & Co".to_string(),
            body: "Loved <it>".to_string(),
            reply_chain: reply_chain.to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 5, 22, 10, 0, 0).unwrap(),
            time_source: TimeSource::Absolute,
            category: Category::Nsfw,
            host: "Dragonholic".to_string(),
            translator: "Turtle".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 22, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_render_comment_item() {
        let records = [record("c-41", "In reply to Mira"), record("c-40", "")];
        let xml = render_comments_feed(&config(), &records, now()).unwrap();

        assert!(xml.contains("<title>Aggregated Comments Feed</title>"));
        assert!(xml.contains("xmlns:dc=\"http://purl.org/dc/elements/1.1/\""));
        assert!(xml.contains("<title>The Villain</title>"));
        assert!(xml.contains("<chapter>Chapter 12</chapter>"));
        assert!(xml.contains("<dc:creator>Reader &amp; Co</dc:creator>"));
        assert!(xml.contains("<description>Loved &lt;it&gt;</description>"));
        assert!(xml.contains("<category>NSFW</category>"));
        assert!(xml.contains("<discord_role_id>&lt;@&amp;123&gt;</discord_role_id>"));
        assert!(xml.contains("<featuredImage url=\"https://dragonholic.com/cover.jpg\"/>"));
        assert!(xml.contains("<pubDate>Thu, 22 May 2025 10:00:00 +0000</pubDate>"));
        assert!(xml.contains("<hostLogo url=\"https://dragonholic.com/logo.png\"/>"));
        assert!(xml.contains("<guid isPermaLink=\"false\">c-41</guid>"));

        assert_eq!(xml.matches("<reply_chain>").count(), 1);
        assert!(xml.contains("<reply_chain>ᯓ✿ In reply to Mira</reply_chain>"));
        assert!(xml.find("c-41").unwrap() < xml.find("c-40").unwrap());
    }

    #[test]
    fn test_render_empty_comments_feed() {
        let xml = render_comments_feed(&config(), &[], now()).unwrap();
        assert!(!xml.contains("<item>"));
        assert!(xml.trim_end().ends_with("</rss>"));
    }
}
