//! Data models for scraped articles and the feed built from them.
//!
//! - [`Article`]: one record extracted from the news listing
//! - [`FeedItem`]: read-only projection of an article as a feed entry
//! - [`FeedMetadata`]: channel-level information for the RSS document

use chrono::{DateTime, FixedOffset, Utc};

/// An article as extracted from a listing page.
///
/// `url` is the sole identity: two records with the same url are the same
/// article regardless of any other field. `title` and `url` are always
/// non-empty; candidates missing either never become an `Article`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Headline text.
    pub title: String,
    /// Absolute http(s) URL of the article.
    pub url: String,
    /// Standfirst/teaser text. Empty when the listing had none.
    pub description: String,
    /// Publication time in the source's own offset, when it could be parsed.
    pub published_at: Option<DateTime<FixedOffset>>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: String::new(),
            published_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<FixedOffset>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// An entry of the generated feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Reader-side dedup key; always the article url.
    pub guid: String,
}

impl From<&Article> for FeedItem {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            link: article.url.clone(),
            description: article.description.clone(),
            published_at: article.published_at,
            guid: article.url.clone(),
        }
    }
}

/// Channel metadata written at the top of the feed.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub generator: String,
    pub last_build_date: DateTime<Utc>,
}

impl FeedMetadata {
    /// Metadata for the AFL.com.au news feed, stamped with the build time.
    pub fn afl(last_build_date: DateTime<Utc>) -> Self {
        Self {
            title: "afl.com.au".to_string(),
            link: "https://www.afl.com.au/news".to_string(),
            description: "Latest news from AFL.com.au".to_string(),
            language: "en".to_string(),
            generator: "AFL RSS Feed Generator".to_string(),
            last_build_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_builder() {
        let published = DateTime::parse_from_rfc3339("2025-03-09T10:00:00+08:00").unwrap();
        let article = Article::new("Title", "https://www.afl.com.au/news/1")
            .with_description("Teaser")
            .with_published_at(published);

        assert_eq!(article.title, "Title");
        assert_eq!(article.description, "Teaser");
        assert_eq!(article.published_at, Some(published));
    }

    #[test]
    fn test_article_defaults_are_explicitly_unset() {
        let article = Article::new("Title", "https://www.afl.com.au/news/1");
        assert!(article.description.is_empty());
        assert!(article.published_at.is_none());
    }

    #[test]
    fn test_feed_item_guid_is_url() {
        let article = Article::new("Title", "https://www.afl.com.au/news/1");
        let item = FeedItem::from(&article);
        assert_eq!(item.guid, "https://www.afl.com.au/news/1");
        assert_eq!(item.link, item.guid);
        assert_eq!(item.title, "Title");
    }

    #[test]
    fn test_afl_metadata() {
        let meta = FeedMetadata::afl(Utc::now());
        assert_eq!(meta.title, "afl.com.au");
        assert_eq!(meta.link, "https://www.afl.com.au/news");
    }
}
