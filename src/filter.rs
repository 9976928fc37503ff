//! Exclusion rules and the recency window.
//!
//! An article is dropped when either predicate rejects it:
//!
//! - **pattern exclusion**: its url contains a configured url pattern, or its
//!   title contains a configured keyword
//! - **recency**: it has no publication date, was published more than
//!   `window` before the reference time, or is dated after the reference time
//!
//! Selection is pure and order-preserving.

use crate::config::FilterConfig;
use crate::models::Article;
use chrono::{DateTime, Duration, Utc};

/// Why an article was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UrlPattern,
    TitleKeyword,
    Undated,
    Stale,
    FutureDated,
}

/// Filtered-out counts by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub url_pattern: usize,
    pub title_keyword: usize,
    pub undated: usize,
    pub stale: usize,
    pub future_dated: usize,
}

impl RejectionCounts {
    fn record(&mut self, reason: Rejection) {
        match reason {
            Rejection::UrlPattern => self.url_pattern += 1,
            Rejection::TitleKeyword => self.title_keyword += 1,
            Rejection::Undated => self.undated += 1,
            Rejection::Stale => self.stale += 1,
            Rejection::FutureDated => self.future_dated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.url_pattern + self.title_keyword + self.undated + self.stale + self.future_dated
    }
}

/// Articles that survived filtering, plus what was dropped and why.
#[derive(Debug, Default)]
pub struct Selection {
    pub retained: Vec<Article>,
    pub rejected: RejectionCounts,
}

/// Keep the articles that pass both the pattern rules and the recency window.
///
/// # Arguments
///
/// * `articles` - Scraped articles, in scrape order
/// * `config` - Url patterns and title keywords to exclude
/// * `reference` - The run time the window is measured back from
/// * `window` - Maximum age of a retained article
///
/// # Returns
///
/// A [`Selection`] whose `retained` list keeps the input order, with the
/// first rejection reason of every dropped article counted.
pub fn select(
    articles: Vec<Article>,
    config: &FilterConfig,
    reference: DateTime<Utc>,
    window: Duration,
) -> Selection {
    let mut selection = Selection::default();
    for article in articles {
        match rejection(&article, config, reference, window) {
            Some(reason) => selection.rejected.record(reason),
            None => selection.retained.push(article),
        }
    }
    selection
}

/// First reason `article` should be dropped, if any.
pub fn rejection(
    article: &Article,
    config: &FilterConfig,
    reference: DateTime<Utc>,
    window: Duration,
) -> Option<Rejection> {
    if matches_any(&article.url, &config.url_patterns, config.case_sensitive) {
        return Some(Rejection::UrlPattern);
    }
    if matches_any(&article.title, &config.title_keywords, config.case_sensitive) {
        return Some(Rejection::TitleKeyword);
    }
    recency(article, reference, window)
}

/// True when the article is inside the recency window.
///
/// Undated articles are never recent, whatever the window.
pub fn is_recent(article: &Article, reference: DateTime<Utc>, window: Duration) -> bool {
    recency(article, reference, window).is_none()
}

fn recency(article: &Article, reference: DateTime<Utc>, window: Duration) -> Option<Rejection> {
    let Some(published) = article.published_at else {
        return Some(Rejection::Undated);
    };
    let age = reference.signed_duration_since(published);
    if age < Duration::zero() {
        Some(Rejection::FutureDated)
    } else if age > window {
        Some(Rejection::Stale)
    } else {
        None
    }
}

fn matches_any(haystack: &str, needles: &[String], case_sensitive: bool) -> bool {
    if haystack.is_empty() {
        return false;
    }
    if case_sensitive {
        needles
            .iter()
            .any(|n| !n.is_empty() && haystack.contains(n.as_str()))
    } else {
        let haystack = haystack.to_lowercase();
        needles
            .iter()
            .any(|n| !n.is_empty() && haystack.contains(&n.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn article(url: &str, title: &str, published: Option<&str>) -> Article {
        let article = Article::new(title, url);
        match published {
            Some(ts) => article.with_published_at(DateTime::parse_from_rfc3339(ts).unwrap()),
            None => article,
        }
    }

    fn rules(urls: &[&str], titles: &[&str]) -> FilterConfig {
        FilterConfig {
            url_patterns: urls.iter().map(|s| s.to_string()).collect(),
            title_keywords: titles.iter().map(|s| s.to_string()).collect(),
            case_sensitive: true,
        }
    }

    #[test]
    fn test_pattern_and_recency_scenario() {
        let articles = vec![
            article("https://www.afl.com.au/aflw/x", "A", Some("2025-03-09T23:00:00+08:00")),
            article("https://www.afl.com.au/news/y", "B", Some("2025-03-09T10:00:00+08:00")),
            article("https://www.afl.com.au/news/z", "C", Some("2025-03-01T00:00:00+08:00")),
        ];
        let selection = select(
            articles,
            &rules(&["/aflw/"], &[]),
            at("2025-03-10T00:00:00+08:00"),
            Duration::hours(24),
        );

        let urls: Vec<_> = selection.retained.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://www.afl.com.au/news/y"]);
        assert_eq!(selection.rejected.url_pattern, 1);
        assert_eq!(selection.rejected.stale, 1);
        assert_eq!(selection.rejected.total(), 2);
    }

    #[test]
    fn test_undated_never_recent() {
        let undated = article("https://www.afl.com.au/news/u", "U", None);
        let now = at("2025-03-10T00:00:00Z");
        for window in [Duration::zero(), Duration::hours(24), Duration::days(36500)] {
            assert!(!is_recent(&undated, now, window));
        }
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = at("2025-03-10T00:00:00Z");
        let edge = article("https://www.afl.com.au/news/e", "E", Some("2025-03-09T00:00:00Z"));
        let past = article("https://www.afl.com.au/news/p", "P", Some("2025-03-08T23:59:59Z"));
        let exact = article("https://www.afl.com.au/news/n", "N", Some("2025-03-10T00:00:00Z"));

        assert!(is_recent(&edge, now, Duration::hours(24)));
        assert!(!is_recent(&past, now, Duration::hours(24)));
        assert!(is_recent(&exact, now, Duration::hours(24)));
    }

    #[test]
    fn test_future_dated_is_not_recent() {
        let now = at("2025-03-10T00:00:00Z");
        let future = article("https://www.afl.com.au/news/f", "F", Some("2025-03-10T00:00:01Z"));
        assert_eq!(
            rejection(&future, &FilterConfig::default(), now, Duration::hours(24)),
            Some(Rejection::FutureDated)
        );
    }

    #[test]
    fn test_offsets_compared_as_instants() {
        let now = at("2025-03-10T00:00:00+08:00");
        // 2025-03-09T12:00:00-04:00 == 2025-03-10T00:00:00+08:00
        let same_instant =
            article("https://www.afl.com.au/news/o", "O", Some("2025-03-09T12:00:00-04:00"));
        assert!(is_recent(&same_instant, now, Duration::zero()));
    }

    #[test]
    fn test_title_keyword_exclusion() {
        let now = at("2025-03-10T00:00:00Z");
        let aflw = article("https://www.afl.com.au/news/1", "AFLW round 3", Some("2025-03-09T20:00:00Z"));
        assert_eq!(
            rejection(&aflw, &rules(&[], &["AFLW"]), now, Duration::hours(24)),
            Some(Rejection::TitleKeyword)
        );
    }

    #[test]
    fn test_case_sensitivity_option() {
        let now = at("2025-03-10T00:00:00Z");
        let story = article("https://www.afl.com.au/AFLW/1", "aflw preview", Some("2025-03-09T20:00:00Z"));

        let sensitive = rules(&["/aflw/"], &["AFLW"]);
        assert_eq!(rejection(&story, &sensitive, now, Duration::hours(24)), None);

        let insensitive = FilterConfig {
            case_sensitive: false,
            ..sensitive
        };
        assert_eq!(
            rejection(&story, &insensitive, now, Duration::hours(24)),
            Some(Rejection::UrlPattern)
        );
    }

    #[test]
    fn test_empty_rules_exclude_nothing() {
        let now = at("2025-03-10T00:00:00Z");
        let articles = vec![
            article("https://www.afl.com.au/news/1", "One", Some("2025-03-09T20:00:00Z")),
            article("https://www.afl.com.au/news/2", "Two", Some("2025-03-09T21:00:00Z")),
        ];
        let selection = select(articles, &FilterConfig::default(), now, Duration::hours(24));
        assert_eq!(selection.retained.len(), 2);
        assert_eq!(selection.rejected, RejectionCounts::default());
    }

    #[test]
    fn test_blank_rule_matches_nothing() {
        let now = at("2025-03-10T00:00:00Z");
        let one = article("https://www.afl.com.au/news/1", "One", Some("2025-03-09T20:00:00Z"));
        assert_eq!(rejection(&one, &rules(&[""], &[""]), now, Duration::hours(24)), None);
    }

    #[test]
    fn test_adding_pattern_never_grows_selection() {
        let now = at("2025-03-10T00:00:00Z");
        let articles = vec![
            article("https://www.afl.com.au/news/1", "Trade news", Some("2025-03-09T20:00:00Z")),
            article("https://www.afl.com.au/aflw/2", "AFLW", Some("2025-03-09T21:00:00Z")),
            article("https://www.afl.com.au/video/3", "Highlights", Some("2025-03-09T22:00:00Z")),
            article("https://www.afl.com.au/news/4", "Old", Some("2025-03-01T22:00:00Z")),
        ];

        let mut config = FilterConfig::default();
        let mut previous = select(articles.clone(), &config, now, Duration::hours(24)).retained;
        for pattern in ["/video/", "/aflw/", "/news/", "/nothing/"] {
            config.url_patterns.push(pattern.to_string());
            let retained = select(articles.clone(), &config, now, Duration::hours(24)).retained;
            assert!(retained.len() <= previous.len());
            assert!(retained.iter().all(|a| previous.contains(a)));
            previous = retained;
        }
        assert!(previous.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let now = at("2025-03-10T00:00:00Z");
        let articles: Vec<_> = (0..5)
            .map(|i| {
                article(
                    &format!("https://www.afl.com.au/news/{i}"),
                    &format!("T{i}"),
                    Some("2025-03-09T20:00:00Z"),
                )
            })
            .collect();
        let retained = select(articles.clone(), &FilterConfig::default(), now, Duration::hours(24)).retained;
        assert_eq!(retained, articles);
    }
}
