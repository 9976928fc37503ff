//! Listing scrapers.
//!
//! Scraping is split in two phases:
//!
//! 1. **Extraction** ([`afl`]): one fetched listing page becomes a list of
//!    [`Article`](crate::models::Article)s plus an optional next-page link
//! 2. **Pagination** ([`paginator`]): extraction is driven across pages up
//!    to a hard page limit and the results are concatenated
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | AFL.com.au | [`afl`] | HTML scraping | `<article>` cards, `rel="next"` pagination |

pub mod afl;
pub mod paginator;
