//! Host comment feeds.
//!
//! Hosts publish recent reader comments as one site-wide RSS feed. Entry
//! titles name the novel (`"Comment on <novel> by <author>"`); bodies may
//! start with an `In reply to <name>` header.

use std::sync::LazyLock;

use async_trait::async_trait;
use feed_rs::parser;
use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{HostConfig, RawComment};
use crate::utils::collapse_whitespace;
use crate::utils::http::fetch_bytes;

static COMMENT_TITLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^Comment on\s+(.+?)\s+by\s+.+$").ok());
static LEADING_TAGS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:\s*<[^>]+>\s*)+").ok());
static REPLY_TAGGED_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*in\s+reply\s+to\s*<[^>]*>([^<]+)</[^>]*>\s*[.,:;!?]?\s*(.*)$").ok()
});
static REPLY_PLAIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*in\s+reply\s+to\s+([^.:\n<]+)[.,:;!?]?\s*(.+)?$").ok()
});
static SPACE_BEFORE_PUNCT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?;:])").ok());

/// Source of a host's raw comments.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Fetch the host's comment feed; hosts without one yield nothing.
    async fn fetch(&self, host: &HostConfig) -> Result<Vec<RawComment>>;
}

/// Reads `comments_feed_url` over HTTP.
pub struct FeedCommentSource {
    client: reqwest::Client,
}

impl FeedCommentSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommentSource for FeedCommentSource {
    async fn fetch(&self, host: &HostConfig) -> Result<Vec<RawComment>> {
        let Some(url) = host.comments_feed_url.as_deref() else {
            return Ok(Vec::new());
        };
        let body = fetch_bytes(&self.client, url)
            .await
            .map_err(|e| AppError::fetch(&host.name, e))?;
        parse_comment_feed(&body).map_err(|e| AppError::fetch(&host.name, e))
    }
}

/// Parse a comments feed document.
pub fn parse_comment_feed(bytes: &[u8]) -> Result<Vec<RawComment>> {
    let feed = parser::parse(bytes)
        .map_err(|e| AppError::validation(format!("failed to parse comments feed: {e}")))?;

    let comments = feed
        .entries
        .into_iter()
        .map(|entry| RawComment {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry.links.first().map(|l| l.href.clone()),
            author: entry
                .authors
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            body_html: entry
                .content
                .and_then(|c| c.body)
                .or(entry.summary.map(|t| t.content))
                .unwrap_or_default(),
            id: Some(entry.id).filter(|id| !id.trim().is_empty()),
            date_text: entry.published.or(entry.updated).map(|dt| dt.to_rfc3339()),
        })
        .collect();
    Ok(comments)
}

/// Novel title from `"Comment on <novel> by <author>"`, if the title has that shape.
pub fn split_comment_title(title: &str) -> Option<String> {
    let collapsed = collapse_whitespace(title);
    let caps = COMMENT_TITLE_RE.as_ref()?.captures(&collapsed)?;
    let novel = caps.get(1)?.as_str().trim();
    (!novel.is_empty()).then(|| novel.to_string())
}

/// Split an `In reply to <name>` header off a comment body.
///
/// Returns `(reply_chain, body_html)`; the chain is empty for top-level comments.
pub fn split_reply_chain(body_html: &str) -> (String, String) {
    let collapsed = collapse_whitespace(body_html);
    let head = match LEADING_TAGS_RE.as_ref() {
        Some(re) => re.replace(&collapsed, "").into_owned(),
        None => collapsed.clone(),
    };

    for re in [REPLY_TAGGED_RE.as_ref(), REPLY_PLAIN_RE.as_ref()]
        .into_iter()
        .flatten()
    {
        if let Some(caps) = re.captures(&head) {
            let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let body = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if !name.is_empty() {
                return (format!("In reply to {name}"), tidy_punctuation(body));
            }
        }
    }
    (String::new(), body_html.trim().to_string())
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    tidy_punctuation(&collapse_whitespace(&text))
}

fn tidy_punctuation(text: &str) -> String {
    match SPACE_BEFORE_PUNCT_RE.as_ref() {
        Some(re) => re.replace_all(text, "$1").into_owned(),
        None => text.to_string(),
    }
}
