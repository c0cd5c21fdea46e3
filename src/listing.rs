use std::sync::LazyLock;

use chrono::NaiveDate;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::error::ParseError;
use crate::fetch::PageFetcher;
use crate::model::AdvisorySummary;
use crate::parser::normalize::normalize_text;
use crate::settings::Settings;

const LISTING_DATE_FORMAT: &str = "%b %d, %Y";

static TEASER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article.c-teaser").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".c-teaser__title").unwrap());
static DATE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".c-teaser__date").unwrap());
static META_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".c-teaser__meta").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Parse one listing page. Malformed entries are logged and skipped.
pub fn parse_listing(html: &str, base: &Url) -> Vec<AdvisorySummary> {
    let document = Html::parse_document(html);
    document
        .select(&TEASER_SEL)
        .enumerate()
        .filter_map(|(i, teaser)| match parse_teaser(&teaser, base) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Skipping listing entry #{}: {}", i + 1, e);
                None
            }
        })
        .collect()
}

fn parse_teaser(teaser: &ElementRef, base: &Url) -> Result<AdvisorySummary, ParseError> {
    let title = field_text(teaser, &TITLE_SEL).ok_or(ParseError::MissingField("title"))?;
    let date = field_text(teaser, &DATE_SEL).ok_or(ParseError::MissingField("date"))?;
    let alert_code = field_text(teaser, &META_SEL).ok_or(ParseError::MissingField("alert code"))?;
    let href = teaser
        .select(&LINK_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or(ParseError::MissingField("link"))?;

    let publication_date = parse_listing_date(&date)?;
    let detail_url = base.join(href.trim()).map_err(|e| ParseError::BadLink {
        href: href.to_string(),
        reason: e.to_string(),
    })?;

    Ok(AdvisorySummary {
        title,
        publication_date,
        alert_code,
        detail_url: detail_url.to_string(),
    })
}

fn field_text(el: &ElementRef, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(|f| normalize_text(&f.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Listing dates look like "Jan 05, 2023".
pub fn parse_listing_date(s: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(s.trim(), LISTING_DATE_FORMAT)
        .map_err(|_| ParseError::BadDate(s.to_string()))
}

/// Walks listing pages from index 0 until a page parses to nothing.
pub struct ListingPager<'a, F> {
    fetcher: &'a F,
    settings: &'a Settings,
    base: Url,
    page: usize,
    max_pages: Option<usize>,
    done: bool,
}

impl<'a, F: PageFetcher> ListingPager<'a, F> {
    pub fn new(fetcher: &'a F, settings: &'a Settings, base: Url) -> Self {
        Self {
            fetcher,
            settings,
            base,
            page: 0,
            max_pages: None,
            done: false,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Next non-empty batch, or `None` once the listing is exhausted.
    ///
    /// A fetch error ends pagination; pages are never retried.
    pub async fn next_batch(&mut self) -> Option<Vec<AdvisorySummary>> {
        if self.done || self.max_pages.is_some_and(|m| self.page >= m) {
            self.done = true;
            return None;
        }

        let url = self.settings.listing_page_url(self.page);
        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Stopping pagination at page {}: {}", self.page, e);
                self.done = true;
                return None;
            }
        };

        let batch = parse_listing(&html, &self.base);
        if batch.is_empty() {
            info!("Listing page {} is empty, pagination complete", self.page);
            self.done = true;
            return None;
        }

        info!("Listing page {}: {} advisories", self.page, batch.len());
        self.page += 1;
        Some(batch)
    }

    /// Drain every remaining batch into one list, preserving listing order.
    pub async fn collect_all(mut self) -> Vec<AdvisorySummary> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await {
            all.extend(batch);
        }
        all
    }
}

// ── Tests ──
