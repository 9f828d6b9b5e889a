// src/utils/url.rs

//! Chapter link helpers.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Words kept lowercase inside a title unless first or last.
static SMALL_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "but", "or", "nor", "for", "so", "yet", "at", "by", "in",
        "of", "on", "to", "up", "via",
    ]
    .into_iter()
    .collect()
});

static CHAPTER_TAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|-)chapter-(?:(extra)-)?(\d+(?:\.\d+)?)(?:-|$)").ok()
});
static EXTRA_TAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|-)extra-(\d+)(?:-|$)").ok());

const HOMEPAGE: &str = "Homepage";

/// Leading words that introduce a numbered volume label.
const VOLUME_KEYWORDS: &[&str] = &[
    "volume", "chapter", "vol", "chap", "arc", "world", "plane", "story", "v",
];

/// Title-case a list of words, keeping small words lowercase in the middle.
pub fn smart_title(words: &[&str]) -> String {
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let lower = w.to_lowercase();
            if i == 0 || i == last || !SMALL_WORDS.contains(lower.as_str()) {
                capitalize(&lower)
            } else {
                lower
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derive a volume label from a `/novel/<slug>/<volume-…>/<chapter-…>/` link.
///
/// `".../novel/x/volume-1-the-beginning/chapter-3/"` gives `"Volume 1: The Beginning"`.
/// Links without a volume segment give an empty string.
pub fn volume_from_link(link: &str) -> String {
    let Ok(parsed) = ::url::Url::parse(link) else {
        return String::new();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 4 || segments[0] != "novel" {
        return String::new();
    }

    let decoded = percent_decode(segments[2]).replace('_', "-");
    let parts: Vec<&str> = decoded
        .trim_matches('-')
        .split('-')
        .filter(|p| !p.is_empty())
        .collect();
    let Some(lead) = parts.first().map(|p| p.to_lowercase()) else {
        return String::new();
    };

    let numbered = parts.len() >= 2 && parts[1].chars().all(|c| c.is_ascii_digit());
    if VOLUME_KEYWORDS.contains(&lead.as_str()) && numbered {
        let num = parts[1];
        let rest = &parts[2..];
        let label = if lead == "v" {
            format!("V{num}")
        } else {
            format!("{} {num}", capitalize(&lead))
        };
        return if rest.is_empty() {
            label
        } else {
            format!("{label}: {}", smart_title(rest))
        };
    }

    smart_title(&parts)
}

/// Chapter label of the page a comment was left on.
///
/// `".../novel/x/chapter-12-the-return/#comment-9"` gives `"Chapter 12"`,
/// `".../chapter-extra-3/"` gives `"Chapter Extra 3"`. Novel pages and
/// unparseable links give `"Homepage"`.
pub fn chapter_from_comment_link(link: &str) -> String {
    let Ok(parsed) = ::url::Url::parse(link) else {
        return HOMEPAGE.to_string();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let Some(tail_slug) = segments.last().filter(|_| segments.len() > 2) else {
        return HOMEPAGE.to_string();
    };

    let tail = tail_slug.to_lowercase();
    if tail == "homepage" || tail == "comments" {
        return HOMEPAGE.to_string();
    }
    if let Some(caps) = CHAPTER_TAIL_RE.as_ref().and_then(|re| re.captures(&tail)) {
        let extra = if caps.get(1).is_some() { "Extra " } else { "" };
        let num = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        return format!("Chapter {extra}{num}");
    }
    if let Some(caps) = EXTRA_TAIL_RE.as_ref().and_then(|re| re.captures(&tail)) {
        let num = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return format!("Chapter Extra {num}");
    }

    let humanized = percent_decode(tail_slug).replace('-', " ").trim().to_string();
    let lower = humanized.to_lowercase();
    if humanized.is_empty() || lower.starts_with("novel") || lower.starts_with("comments") {
        HOMEPAGE.to_string()
    } else {
        humanized
    }
}

fn percent_decode(segment: &str) -> String {
    ::url::form_urlencoded::parse(segment.as_bytes())
        .map(|(k, v)| if v.is_empty() { k.into_owned() } else { format!("{k}={v}") })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_title() {
        assert_eq!(smart_title(&["the", "end", "of", "the", "world"]), "The End of the World");
        assert_eq!(smart_title(&["rise", "up"]), "Rise Up");
        assert_eq!(smart_title(&[]), "");
    }

    #[test]
    fn test_volume_from_link_numbered() {
        assert_eq!(
            volume_from_link("https://dragonholic.com/novel/villain/volume-1-the-beginning/chapter-3/"),
            "Volume 1: The Beginning"
        );
        assert_eq!(
            volume_from_link("https://dragonholic.com/novel/villain/v-2/chapter-30/"),
            "V2"
        );
        assert_eq!(
            volume_from_link("https://dragonholic.com/novel/villain/arc-3-city-of-ash/chapter-30/"),
            "Arc 3: City of Ash"
        );
    }

    #[test]
    fn test_volume_from_link_unnumbered() {
        assert_eq!(
            volume_from_link("https://dragonholic.com/novel/villain/side_stories/extra-1/"),
            "Side Stories"
        );
    }

    #[test]
    fn test_volume_from_link_without_volume_segment() {
        assert_eq!(volume_from_link("https://dragonholic.com/novel/villain/chapter-3/"), "");
        assert_eq!(volume_from_link("https://other.com/read/villain/a/b/"), "");
        assert_eq!(volume_from_link("not a link"), "");
    }

    #[test]
    fn test_chapter_from_comment_link() {
        let base = "https://dragonholic.com/novel/villain";
        assert_eq!(
            chapter_from_comment_link(&format!("{base}/chapter-12-the-return/#comment-9")),
            "Chapter 12"
        );
        assert_eq!(chapter_from_comment_link(&format!("{base}/chapter-12.5/")), "Chapter 12.5");
        assert_eq!(
            chapter_from_comment_link(&format!("{base}/chapter-extra-3/")),
            "Chapter Extra 3"
        );
        assert_eq!(chapter_from_comment_link(&format!("{base}/extra-4/")), "Chapter Extra 4");
        assert_eq!(chapter_from_comment_link(&format!("{base}/side-story/")), "side story");
        assert_eq!(chapter_from_comment_link(&format!("{base}/#comment-9")), "Homepage");
        assert_eq!(chapter_from_comment_link("https://dragonholic.com/comments/feed/"), "Homepage");
        assert_eq!(chapter_from_comment_link("not a link"), "Homepage");
    }
}
