//! BBC News.
//!
//! The BBC feed descriptions already carry a usable summary, and article
//! pages are heavy with client-rendered markup, so the article page is not
//! fetched and `pubDate` is not carried over.

use super::{ExtractionStrategy, DEFAULT_PARAGRAPH_LIMIT};

pub const SOURCE_ID: &str = "bbc";

pub const STRATEGY: ExtractionStrategy = ExtractionStrategy {
    fetch_article_page: false,
    paragraph_limit: DEFAULT_PARAGRAPH_LIMIT,
    parse_pub_date: false,
    default_content_selectors: &[],
};
