//! AFL.com.au news listing extractor.
//!
//! Turns one listing page into article records and finds the link to the
//! following page. Extraction tolerates structural drift: a candidate missing
//! its headline or link is dropped with a warning, while a missing teaser or
//! date simply leaves that field unset.
//!
//! # Markup
//!
//! ```text
//! <article>
//!   <h2>Headline</h2>            (or <h3>)
//!   <a href="/news/123/slug">    first link, resolved against the page URL
//!   <p>Teaser</p>                optional
//!   <time datetime="...">        optional; falls back to the element text
//! </article>
//! <a href="/news/page/2" rel="next">Next</a>
//! ```

use crate::errors::PipelineError;
use crate::models::Article;
use crate::utils::truncate_for_log;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

/// Default listing page.
pub const NEWS_URL: &str = "https://www.afl.com.au/news";

static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static H2: Lazy<Selector> = Lazy::new(|| selector("h2"));
static H3: Lazy<Selector> = Lazy::new(|| selector("h3"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time"));
static NEXT_REL: Lazy<Selector> = Lazy::new(|| selector(r#"a[rel~="next"][href]"#));

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal regex is valid"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Timestamps carrying their own offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Timestamps without an offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Long-form display dates, after ordinal suffixes are stripped.
const TEXT_FORMATS: &[&str] = &[
    "%d %B %Y, %I:%M %p %z",
    "%d %B %Y %I:%M %p %z",
    "%d %B %Y, %H:%M %z",
    "%d %B %Y %H:%M %z",
    "%B %d, %Y %I:%M %p %z",
    "%B %d, %Y %H:%M %z",
    "%B %d, %Y %H:%M %:z",
];

/// Result of extracting a single listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    /// Valid articles in document order.
    pub articles: Vec<Article>,
    /// Link to the following page, when the page advertises one.
    pub next_page: Option<Url>,
    /// Candidates dropped for lacking a headline or link.
    pub dropped: usize,
}

/// Decode a fetched body, failing when it is not UTF-8 text.
pub fn decode_page(page_url: &Url, body: Vec<u8>) -> Result<String, PipelineError> {
    String::from_utf8(body).map_err(|e| PipelineError::Extraction {
        url: page_url.to_string(),
        reason: format!("page is not valid UTF-8: {e}"),
    })
}

/// Extract articles and the next-page link from one listing page.
#[instrument(level = "debug", skip_all, fields(%page_url))]
pub fn extract(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let mut page = ListingPage::default();

    for (index, node) in document.select(&ARTICLE).enumerate() {
        match parse_candidate(node, page_url) {
            Ok(article) => page.articles.push(article),
            Err(missing) => {
                page.dropped += 1;
                warn!(
                    index,
                    missing,
                    snippet = %truncate_for_log(&element_text(node), 80),
                    "Dropping article candidate"
                );
            }
        }
    }

    page.next_page = find_next_page(&document, page_url);
    debug!(
        articles = page.articles.len(),
        dropped = page.dropped,
        next_page = ?page.next_page.as_ref().map(Url::as_str),
        "Extracted listing page"
    );
    page
}

/// Build an [`Article`] from one candidate node, or name the missing field.
fn parse_candidate(node: ElementRef<'_>, page_url: &Url) -> Result<Article, &'static str> {
    let title = node
        .select(&H2)
        .next()
        .or_else(|| node.select(&H3).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or("title")?;

    let url = node
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve(page_url, href))
        .ok_or("url")?;

    let description = node
        .select(&PARAGRAPH)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let published_at = node.select(&TIME).next().and_then(|time| {
        let raw = time
            .value()
            .attr("datetime")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| element_text(time));
        let parsed = parse_published(&raw);
        if parsed.is_none() {
            debug!(%raw, "Unrecognised publication date; leaving unset");
        }
        parsed
    });

    Ok(Article {
        title,
        url: url.to_string(),
        description,
        published_at,
    })
}

/// First usable `rel="next"` link, else the first usable link labelled "Next".
///
/// A link whose href does not resolve to http(s) is skipped, not taken as the
/// end of the listing.
fn find_next_page(document: &Html, page_url: &Url) -> Option<Url> {
    document
        .select(&NEXT_REL)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve(page_url, href))
        .or_else(|| {
            document
                .select(&LINK)
                .filter(|a| element_text(*a).eq_ignore_ascii_case("next"))
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| resolve(page_url, href))
        })
}

/// Resolve `href` against the page URL, keeping only http(s) targets.
fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Element text with runs of whitespace collapsed to single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a publication timestamp in any of the known source formats.
///
/// Returns `None` rather than guessing when the text matches none of them;
/// callers treat an unset date as "not recent".
pub fn parse_published(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc().fixed_offset());
    }

    let text = ORDINAL.replace_all(raw, "$1");
    TEXT_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&text, fmt).ok())
}
