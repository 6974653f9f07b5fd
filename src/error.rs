//! Error taxonomy for the scraper.
//!
//! Only configuration errors are fatal. Network and feed errors are recovered
//! inside the fetcher and pipeline, and a selector miss is not an error at all
//! (extractors return `None`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed feed XML: {0}")]
    FeedParse(String),

    #[error("invalid article link \"{link}\": {reason}")]
    InvalidLink { link: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("failed to serialize articles: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write output {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScrapeError {
    /// Whether the fetcher should retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScrapeError::Network { .. } | ScrapeError::Status { .. })
    }

    /// Whether the error comes from loading or validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ScrapeError::Config(_) | ScrapeError::ConfigIo { .. } | ScrapeError::ConfigParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_transient() {
        let err = ScrapeError::Status {
            status: 503,
            url: "https://example.com/rss".to_string(),
        };
        assert!(err.is_transient());
        assert!(!err.is_config());
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 503 from https://example.com/rss"
        );
    }

    #[test]
    fn config_errors_are_not_transient() {
        let err = ScrapeError::Config("source 'bbc' is missing rss_feed".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: source 'bbc' is missing rss_feed"
        );
        assert!(!err.is_transient());
        assert!(err.is_config());
    }

    #[test]
    fn config_parse_and_io_are_config() {
        let parse = serde_yaml::from_str::<serde_yaml::Mapping>("key: [unclosed").unwrap_err();
        assert!(ScrapeError::from(parse).is_config());

        let io = ScrapeError::ConfigIo {
            path: "news_sources.yaml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(io.is_config());
        assert!(!io.is_transient());
    }

    #[test]
    fn feed_parse_is_not_transient() {
        let err = ScrapeError::FeedParse("unexpected EOF".to_string());
        assert!(!err.is_transient());
        assert!(!err.is_config());
    }
}
