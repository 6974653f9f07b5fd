//! CNN.
//!
//! CNN changes its article layout regularly. When the config doesn't list
//! any `content` selectors, the chain below is tried in order and the first
//! one that matches supplies the first five paragraphs.

use super::{ExtractionStrategy, DEFAULT_PARAGRAPH_LIMIT};

pub const SOURCE_ID: &str = "cnn";

pub const CONTENT_SELECTORS: &[&str] = &[
    "div.l-container p",
    "div.zn-body__paragraph",
    "div.BasicArticle__paragraph p",
    r#"section[data-zone="BasicArticle"] p"#,
    "div.Article__content p",
];

pub const STRATEGY: ExtractionStrategy = ExtractionStrategy {
    fetch_article_page: true,
    paragraph_limit: DEFAULT_PARAGRAPH_LIMIT,
    parse_pub_date: true,
    default_content_selectors: CONTENT_SELECTORS,
};
