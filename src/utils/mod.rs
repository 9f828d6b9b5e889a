//! Utility functions and helpers.

pub mod console;
pub mod http;
pub mod url;

use ::url::Url;
use unicode_segmentation::UnicodeSegmentation;

/// Lowercase, hyphen-separated slug that keeps non-ASCII letters.
///
/// `"[Quick Transmigration] The Beauty"` becomes `"quick-transmigration-the-beauty"`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.unicode_words() {
        for c in word.to_lowercase().chars() {
            if c.is_alphanumeric() {
                out.push(c);
            } else if !out.ends_with('-') {
                out.push('-');
            }
        }
        if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> String {
    match Url::parse(base_url) {
        Ok(base) => resolve_url(&base, href),
        Err(_) => href.to_string(),
    }
}
