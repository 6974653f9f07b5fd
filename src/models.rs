//! Data models for scraped news.
//!
//! - [`Article`]: one scraped unit, the record persisted to JSON
//! - [`FeedItem`]: one valid `<item>` from a publisher's RSS feed
//! - [`PublishedDate`]: a publication date that is either a parsed timestamp
//!   or the raw string the feed carried when it could not be parsed

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A publication date as reported by a feed or article page.
///
/// Feeds are inconsistent about date formats, so an unparseable value is kept
/// verbatim instead of being dropped. Serializes to an ISO-8601 string for
/// [`PublishedDate::Parsed`] and to the original text for [`PublishedDate::Raw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PublishedDate {
    Parsed(DateTime<FixedOffset>),
    Raw(String),
}

impl PublishedDate {
    /// Parse a date as found in feeds and article markup.
    ///
    /// Tries RFC 2822 (the RSS `pubDate` format) and then RFC 3339 / ISO-8601
    /// (the usual `<time datetime>` format). Anything else is kept raw.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        DateTime::parse_from_rfc2822(trimmed)
            .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
            .map(PublishedDate::Parsed)
            .unwrap_or_else(|_| PublishedDate::Raw(trimmed.to_string()))
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, PublishedDate::Parsed(_))
    }
}

impl From<String> for PublishedDate {
    /// Reconstruct from a persisted record, where only ISO-8601 counts as a timestamp.
    fn from(value: String) -> Self {
        match DateTime::parse_from_rfc3339(value.trim()) {
            Ok(dt) => PublishedDate::Parsed(dt),
            Err(_) => PublishedDate::Raw(value),
        }
    }
}

impl From<PublishedDate> for String {
    fn from(value: PublishedDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PublishedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedDate::Parsed(dt) => write!(f, "{}", dt.to_rfc3339()),
            PublishedDate::Raw(raw) => write!(f, "{raw}"),
        }
    }
}

/// A news article assembled from feed metadata and page extraction.
///
/// `title` and `url` are always non-empty for articles produced by the
/// pipeline. `content` is never absent: it is the extracted body, the feed
/// description, or an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub url: String,
    /// Display name of the publisher.
    pub source: String,
    pub author: Option<String>,
    pub published_date: Option<PublishedDate>,
    pub scraped_date: DateTime<Utc>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    /// Create an article stamped with the current time.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: url.into(),
            source: source.into(),
            author: None,
            published_date: None,
            scraped_date: Utc::now(),
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_published_date(mut self, published_date: Option<PublishedDate>) -> Self {
        self.published_date = published_date;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.title.chars().take(50).collect();
        write!(f, "Article(title='{short}...', source='{}')", self.source)
    }
}

/// One valid `<item>` from an RSS feed.
///
/// Only items with a non-empty title and link become `FeedItem`s.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Plain-text description with markup stripped; empty when the feed has none.
    pub description: String,
    pub pub_date: Option<PublishedDate>,
    /// `<author>` or `<dc:creator>`, when the feed names one.
    pub author: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> Article {
        Article::new(
            "Markets rally after rate decision",
            "Stocks rose sharply on Wednesday.",
            "https://example.com/markets",
            "CNN",
        )
    }

    #[test]
    fn test_article_defaults() {
        let before = Utc::now();
        let article = sample_article();
        assert!(article.scraped_date >= before);
        assert!(article.scraped_date <= Utc::now());
        assert!(article.tags.is_empty());
        assert_eq!(article.author, None);
        assert_eq!(article.published_date, None);
        assert_eq!(article.category, None);
    }

    #[test]
    fn test_published_date_parses_rfc2822() {
        let date = PublishedDate::parse("Tue, 06 May 2025 14:30:00 GMT");
        match date {
            PublishedDate::Parsed(dt) => assert_eq!(dt.to_rfc3339(), "2025-05-06T14:30:00+00:00"),
            other => panic!("expected parsed date, got {other:?}"),
        }
    }

    #[test]
    fn test_published_date_parses_iso8601() {
        let date = PublishedDate::parse("2025-05-06T14:30:00-04:00");
        assert!(date.is_parsed());
        assert_eq!(date.to_string(), "2025-05-06T14:30:00-04:00");
    }

    #[test]
    fn test_published_date_keeps_raw_on_failure() {
        let date = PublishedDate::parse("  Updated 2:30 PM EDT, Tue May 6  ");
        assert_eq!(
            date,
            PublishedDate::Raw("Updated 2:30 PM EDT, Tue May 6".to_string())
        );
    }

    #[test]
    fn test_article_serialization_shape() {
        let article = sample_article()
            .with_published_date(Some(PublishedDate::parse("2025-05-06T14:30:00+00:00")));
        let value = serde_json::to_value(&article).unwrap();

        assert_eq!(value["title"], "Markets rally after rate decision");
        assert_eq!(value["author"], serde_json::Value::Null);
        assert_eq!(value["category"], serde_json::Value::Null);
        assert_eq!(value["published_date"], "2025-05-06T14:30:00+00:00");
        assert!(value["scraped_date"].is_string());
        assert_eq!(value["tags"], serde_json::json!([]));
    }

    #[test]
    fn test_article_round_trip() {
        let article = sample_article()
            .with_author(Some("Jane Doe".to_string()))
            .with_published_date(Some(PublishedDate::parse("Tue, 06 May 2025 10:00:00 +0100")))
            .with_category(Some("Business".to_string()))
            .with_tags(vec!["markets".to_string(), "economy".to_string()]);

        let json = serde_json::to_string(&article).unwrap();
        let restored: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, article);
    }

    #[test]
    fn test_raw_published_date_survives_round_trip() {
        let article = sample_article()
            .with_published_date(Some(PublishedDate::Raw("yesterday".to_string())));

        let json = serde_json::to_string(&article).unwrap();
        let restored: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.published_date,
            Some(PublishedDate::Raw("yesterday".to_string()))
        );
    }

    #[test]
    fn test_article_deserialization_without_tags() {
        let json = r#"{
            "title": "Headline",
            "content": "",
            "url": "https://example.com/a",
            "source": "BBC News",
            "author": null,
            "published_date": null,
            "scraped_date": "2025-05-06T08:00:00Z",
            "category": null
        }"#;

        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "Headline");
        assert!(article.tags.is_empty());
        assert!(article.content.is_empty());
    }

    #[test]
    fn test_article_display_truncates_title() {
        let article = Article::new("a".repeat(80), "", "https://example.com", "BBC News");
        assert_eq!(
            article.to_string(),
            format!("Article(title='{}...', source='BBC News')", "a".repeat(50))
        );
    }
}
