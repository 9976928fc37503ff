//! Bounded, sequential traversal of the paginated news listing.
//!
//! Pages are visited one at a time in link order and their articles are
//! concatenated in visit order. Duplicate urls across pages are left alone;
//! identity is the dedup stage's concern.
//!
//! Failure policy:
//! - page 1 fails: the whole scrape fails (nothing to act on)
//! - page N > 1 fails: traversal stops and pages `1..N-1` are returned as a
//!   degraded outcome

use crate::errors::{Outcome, PipelineError};
use crate::fetch::Fetch;
use crate::models::Article;
use crate::scrapers::afl::{decode_page, extract};
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use url::Url;

/// Everything gathered by one traversal.
#[derive(Debug, Default)]
pub struct Scraped {
    /// Articles from all visited pages, in page-visit order.
    pub articles: Vec<Article>,
    /// Number of page fetches attempted, including a failed last one.
    pub pages_fetched: usize,
    /// Candidates dropped by the extractor across all pages.
    pub dropped: usize,
}

/// Walk the listing starting at `start`, fetching at most `max_pages` pages.
///
/// # Arguments
///
/// * `fetcher` - Page source; every call is bounded by its own timeout
/// * `start` - First listing page
/// * `max_pages` - Hard limit on fetches; values below 1 are treated as 1
///
/// # Returns
///
/// `Outcome::Complete` when the chain ended, hit the limit or looped back,
/// and `Outcome::Degraded` with the pages gathered so far when a page after
/// the first failed.
///
/// # Errors
///
/// Returns the transport or extraction error of the first page.
#[instrument(level = "info", skip(fetcher, start), fields(start = %start))]
pub async fn scrape<F: Fetch>(
    fetcher: &F,
    start: &Url,
    max_pages: usize,
) -> Result<Outcome<Scraped>, PipelineError> {
    let max_pages = max_pages.max(1);
    let mut scraped = Scraped::default();
    let mut visited: HashSet<Url> = HashSet::new();
    let mut current = Some(start.clone());

    while let Some(url) = current.take() {
        if scraped.pages_fetched >= max_pages {
            info!(max_pages, next = %url, "Page limit reached; stopping pagination");
            break;
        }
        if !visited.insert(url.clone()) {
            warn!(%url, "Next-page link revisits an earlier page; stopping pagination");
            break;
        }

        scraped.pages_fetched += 1;
        let page_number = scraped.pages_fetched;
        let page = match fetcher
            .fetch(&url)
            .await
            .and_then(|body| decode_page(&url, body))
        {
            Ok(html) => extract(&html, &url),
            Err(e) if page_number == 1 => return Err(e),
            Err(e) => {
                warn!(
                    page = page_number,
                    %url,
                    error = %e,
                    kept = scraped.articles.len(),
                    "Page failed; keeping articles from earlier pages"
                );
                return Ok(Outcome::Degraded(scraped, e));
            }
        };

        info!(
            page = page_number,
            %url,
            articles = page.articles.len(),
            dropped = page.dropped,
            "Scraped listing page"
        );
        scraped.articles.extend(page.articles);
        scraped.dropped += page.dropped;
        current = page.next_page;
    }

    info!(
        pages = scraped.pages_fetched,
        articles = scraped.articles.len(),
        "Scrape complete"
    );
    Ok(Outcome::Complete(scraped))
}
