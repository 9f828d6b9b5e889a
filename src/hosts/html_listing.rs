//! Chapter listing scraped from a novel's HTML page.
//!
//! Defaults target the Madara WordPress theme: one `li.wp-manga-chapter` per
//! chapter, premium rows marked with a `premium` class, the host's chapter id
//! in a `data-chapter-<id>` class, optional volume groups around the rows.

use std::collections::BTreeSet;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::hosts::HostAdapter;
use crate::models::{FeedKind, ListingSelectors, NovelRef, RawEntry};
use crate::utils::collapse_whitespace;
use crate::utils::http::fetch_text;

pub struct HtmlListingAdapter {
    client: reqwest::Client,
}

impl HtmlListingAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HostAdapter for HtmlListingAdapter {
    fn supports(&self, _novel: NovelRef<'_>, _kind: FeedKind) -> bool {
        true
    }

    async fn scrape(&self, novel: NovelRef<'_>, kind: FeedKind) -> Result<Vec<RawEntry>> {
        let html = fetch_text(&self.client, &novel.novel.url)
            .await
            .map_err(|e| AppError::fetch(novel.novel_id(), e))?;
        let entries = parse_listing(&html, &novel.host.selectors, kind)?;
        log::debug!(
            "{}: {} {} rows on listing",
            novel.novel_id(),
            entries.len(),
            kind
        );
        Ok(entries)
    }
}

/// Compiled listing selectors.
struct CompiledSelectors {
    row: Selector,
    title: Selector,
    date: Selector,
    price: Option<Selector>,
    description: Option<Selector>,
    volume: Option<Selector>,
    volume_label: Option<Selector>,
}

impl CompiledSelectors {
    fn compile(selectors: &ListingSelectors) -> Result<Self> {
        let optional = |s: &Option<String>| s.as_deref().map(parse_selector).transpose();
        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            date: parse_selector(&selectors.date_selector)?,
            price: optional(&selectors.price_selector)?,
            description: optional(&selectors.description_selector)?,
            volume: optional(&selectors.volume_selector)?,
            volume_label: optional(&selectors.volume_label_selector)?,
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Extract the rows of a listing page that belong to the given feed.
///
/// Paid rows carry the premium class without the free class; every other row
/// is free.
pub fn parse_listing(
    html: &str,
    selectors: &ListingSelectors,
    kind: FeedKind,
) -> Result<Vec<RawEntry>> {
    let compiled = CompiledSelectors::compile(selectors)?;
    let document = Html::parse_document(html);

    let description = compiled
        .description
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .map(|el| collapse_whitespace(&el.inner_html()))
        .filter(|d| !d.is_empty());

    let mut entries = Vec::new();
    for row in document.select(&compiled.row) {
        let classes: BTreeSet<String> = row.value().classes().map(str::to_string).collect();
        let premium = classes.contains(&selectors.premium_class)
            && !classes.contains(&selectors.free_class);
        let wanted = match kind {
            FeedKind::Paid => premium,
            FeedKind::Free => !premium,
        };
        if !wanted {
            continue;
        }

        let mut entry = RawEntry {
            dom_marker_class: classes,
            description: description.clone(),
            ..RawEntry::default()
        };

        if let Some(title_el) = row.select(&compiled.title).next() {
            entry.raw_title = element_text(title_el);
            entry.link = title_el
                .value()
                .attr(&selectors.attr_name)
                .map(str::to_string);
        }
        entry.date_text = row
            .select(&compiled.date)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());
        entry.price_text = compiled
            .price
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .map(element_text)
            .filter(|t| !t.is_empty());
        entry.volume = volume_label(row, &compiled);

        entries.push(entry);
    }
    Ok(entries)
}

fn volume_label(row: ElementRef<'_>, compiled: &CompiledSelectors) -> Option<String> {
    let (group_sel, label_sel) = (compiled.volume.as_ref()?, compiled.volume_label.as_ref()?);
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| group_sel.matches(el))
        .and_then(|group| group.select(label_sel).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
}
