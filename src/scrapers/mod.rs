//! Per-publisher extraction strategies.
//!
//! Every source runs through the same pipeline; what differs between
//! publishers is a small [`ExtractionStrategy`] record looked up by source
//! identifier (the key under `news_sources` in the config file).
//!
//! # Registered Sources
//!
//! | Source id | Module | Article page | pubDate | Notes |
//! |-----------|--------|--------------|---------|-------|
//! | `bbc` | [`bbc`] | not fetched | ignored | Feed descriptions are the article summary |
//! | `cnn` | [`cnn`] | fetched | parsed | Built-in content fallback chain |
//! | anything else | - | fetched | parsed | Uses configured selectors only |

pub mod bbc;
pub mod cnn;

/// Default number of paragraphs kept from an article page.
pub const DEFAULT_PARAGRAPH_LIMIT: usize = 5;

/// Source-specific knobs that the generic pipeline consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStrategy {
    /// Fetch each item's own page for full-text content.
    pub fetch_article_page: bool,
    /// Maximum number of paragraphs joined into `content`.
    pub paragraph_limit: usize,
    /// Parse the feed's `pubDate`; when false the field is left empty.
    pub parse_pub_date: bool,
    /// Content selectors used when the config lists none.
    pub default_content_selectors: &'static [&'static str],
}

impl Default for ExtractionStrategy {
    fn default() -> Self {
        Self {
            fetch_article_page: true,
            paragraph_limit: DEFAULT_PARAGRAPH_LIMIT,
            parse_pub_date: true,
            default_content_selectors: &[],
        }
    }
}

/// Look up the strategy registered for a source id (case-insensitive).
pub fn strategy_for(source_id: &str) -> ExtractionStrategy {
    match source_id.to_ascii_lowercase().as_str() {
        bbc::SOURCE_ID => bbc::STRATEGY,
        cnn::SOURCE_ID => cnn::STRATEGY,
        _ => ExtractionStrategy::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_sources() {
        assert!(!strategy_for("bbc").fetch_article_page);
        assert!(strategy_for("cnn").fetch_article_page);
        assert!(!strategy_for("cnn").default_content_selectors.is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(strategy_for("CNN"), cnn::STRATEGY);
    }

    #[test]
    fn test_unknown_source_gets_default() {
        let strategy = strategy_for("reuters");
        assert_eq!(strategy, ExtractionStrategy::default());
        assert_eq!(strategy.paragraph_limit, DEFAULT_PARAGRAPH_LIMIT);
        assert!(strategy.parse_pub_date);
    }
}
