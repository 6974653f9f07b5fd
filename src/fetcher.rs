//! HTTP fetching with bounded retries.
//!
//! [`HttpFetcher`] owns one `reqwest::Client` carrying the browser-like
//! default headers publishers expect, and reuses it for every request so
//! connections are pooled across the feed and article fetches of a run.
//!
//! # Retry Strategy
//!
//! - Transport failures, timeouts and non-2xx statuses are retried
//! - At most `retries` retries, so `retries + 1` attempts in total
//! - Linear backoff without jitter: retry `n` waits `n * backoff_unit`
//! - When attempts run out the fetcher returns `None`; callers fall back or
//!   skip, nothing is propagated

use crate::config::ScraperSettings;
use crate::error::ScrapeError;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use scraper::Html;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Which parser a fetched body is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Article pages, parsed with `scraper`.
    Html,
    /// RSS feeds, kept as text for the streaming feed parser.
    Xml,
}

/// A successfully fetched document.
#[derive(Debug)]
pub enum Document {
    Html(Html),
    Xml(String),
}

impl Document {
    fn parse(body: String, mode: ParseMode) -> Self {
        match mode {
            ParseMode::Html => Document::Html(Html::parse_document(&body)),
            ParseMode::Xml => Document::Xml(body),
        }
    }

    pub fn into_html(self) -> Option<Html> {
        match self {
            Document::Html(html) => Some(html),
            Document::Xml(_) => None,
        }
    }

    pub fn into_xml(self) -> Option<String> {
        match self {
            Document::Xml(xml) => Some(xml),
            Document::Html(_) => None,
        }
    }
}

/// Wait before retry number `retry` (1-based).
pub fn backoff_delay(retry: u32, unit: Duration) -> Duration {
    unit.saturating_mul(retry)
}

/// Every wait a fully failing fetch goes through, in order.
///
/// ```ignore
/// assert_eq!(backoff_schedule(2, Duration::from_secs(2)), vec![2s, 4s]);
/// ```
pub fn backoff_schedule(retries: u32, unit: Duration) -> Vec<Duration> {
    (1..=retries).map(|retry| backoff_delay(retry, unit)).collect()
}

fn default_headers(user_agent: &str) -> Result<HeaderMap, ScrapeError> {
    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| ScrapeError::Config(format!("invalid user_agent '{user_agent}': {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, user_agent);
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    Ok(headers)
}

/// GET with retries; cheap to clone, clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    retries: u32,
    backoff_unit: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from the global scraper settings.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] for a user agent that is not a valid
    /// header value, or [`ScrapeError::Network`] if the client cannot be built.
    pub fn new(settings: &ScraperSettings) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .default_headers(default_headers(&settings.user_agent)?)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ScrapeError::Network {
                url: String::new(),
                source: e,
            })?;
        Ok(Self {
            client,
            timeout: settings.timeout(),
            retries: settings.retries,
            backoff_unit: settings.backoff_unit(),
        })
    }

    /// Same client, different timeout and retry budget (per-source overrides).
    pub fn with_policy(&self, timeout: Duration, retries: u32) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
            retries,
            backoff_unit: self.backoff_unit,
        }
    }

    /// Fetch `url` and parse it according to `mode`.
    ///
    /// Returns `None` once every attempt has failed.
    #[instrument(level = "info", skip(self), fields(retries = self.retries))]
    pub async fn fetch(&self, url: &str, mode: ParseMode) -> Option<Document> {
        let total_t0 = Instant::now();
        let max_attempts = self.retries + 1;
        debug!(schedule = ?backoff_schedule(self.retries, self.backoff_unit), "Retry backoff");

        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "Fetching");
            let attempt_t0 = Instant::now();
            match self.get_body(url).await {
                Ok(body) => {
                    debug!(
                        attempt,
                        bytes = body.len(),
                        elapsed_ms = attempt_t0.elapsed().as_millis() as u64,
                        "Fetched"
                    );
                    return Some(Document::parse(body, mode));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        elapsed_ms = attempt_t0.elapsed().as_millis() as u64,
                        error = %e,
                        transient = e.is_transient(),
                        "Request failed"
                    );
                    if attempt == max_attempts {
                        break;
                    }
                    let delay = backoff_delay(attempt, self.backoff_unit);
                    info!(?delay, "Retrying after backoff");
                    sleep(delay).await;
                }
            }
        }

        error!(
            max_attempts,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "Max retries exceeded"
        );
        None
    }

    async fn get_body(&self, url: &str) -> Result<String, ScrapeError> {
        let network = |source: reqwest::Error| ScrapeError::Network {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().await.map_err(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_is, header_exists, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(retries: u32) -> HttpFetcher {
        let settings = ScraperSettings {
            timeout: 5.0,
            retries,
            backoff_unit: 0.0,
            ..ScraperSettings::default()
        };
        HttpFetcher::new(&settings).expect("failed to build test fetcher")
    }

    #[test]
    fn test_backoff_schedule_is_linear_and_increasing() {
        let unit = Duration::from_secs(2);
        let schedule = backoff_schedule(3, unit);
        assert_eq!(
            schedule,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6)
            ]
        );
        assert!(schedule.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_backoff_schedule_for_two_retries() {
        let unit = Duration::from_millis(250);
        assert_eq!(backoff_schedule(2, unit), vec![unit, unit * 2]);
        assert!(backoff_schedule(0, unit).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_returns_html_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body><h1>Hi</h1></body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let doc = test_fetcher(3)
            .fetch(&format!("{}/article", server.uri()), ParseMode::Html)
            .await
            .expect("document");
        let html = doc.into_html().expect("html document");
        let h1 = scraper::Selector::parse("h1").unwrap();
        assert_eq!(html.select(&h1).count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_returns_xml_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
            .mount(&server)
            .await;

        let doc = test_fetcher(0)
            .fetch(&format!("{}/rss.xml", server.uri()), ParseMode::Xml)
            .await
            .expect("document");
        assert_eq!(doc.into_xml().as_deref(), Some("<rss></rss>"));
    }

    #[tokio::test]
    async fn test_fetch_sends_default_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_is("user-agent", "ByteBrief/1.0"))
            .and(header_is("dnt", "1"))
            .and(header_is("upgrade-insecure-requests", "1"))
            .and(headers("accept-language", vec!["en-US", "en;q=0.5"]))
            .and(headers(
                "accept",
                vec!["text/html", "application/xhtml+xml", "application/xml;q=0.9", "*/*;q=0.8"],
            ))
            .and(headers("accept-encoding", vec!["gzip", "deflate"]))
            .and(header_exists("connection"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let doc = test_fetcher(0).fetch(&server.uri(), ParseMode::Xml).await;
        assert!(doc.is_some(), "headers did not match");
    }

    #[tokio::test]
    async fn test_exhausted_retries_make_exactly_retries_plus_one_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let doc = test_fetcher(2).fetch(&server.uri(), ParseMode::Html).await;
        assert!(doc.is_none());
        // MockServer verifies `expect(3)` on drop.
    }

    #[tokio::test]
    async fn test_failing_fetch_waits_out_the_backoff_schedule() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let settings = ScraperSettings {
            timeout: 5.0,
            retries: 2,
            backoff_unit: 0.05,
            ..ScraperSettings::default()
        };
        let fetcher = HttpFetcher::new(&settings).expect("failed to build test fetcher");

        let t0 = Instant::now();
        let doc = fetcher.fetch(&server.uri(), ParseMode::Html).await;
        assert!(doc.is_none());
        // 50ms after the first attempt, 100ms after the second.
        assert!(t0.elapsed() >= Duration::from_millis(150), "{:?}", t0.elapsed());
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .expect(1)
            .mount(&server)
            .await;

        let doc = test_fetcher(3).fetch(&server.uri(), ParseMode::Xml).await;
        assert_eq!(doc.and_then(Document::into_xml).as_deref(), Some("<rss/>"));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = test_fetcher(3).with_policy(Duration::from_millis(50), 0);
        assert!(fetcher.fetch(&server.uri(), ParseMode::Html).await.is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_yields_none() {
        // Port 9 (discard) on localhost is almost never listening.
        let doc = test_fetcher(1)
            .fetch("http://127.0.0.1:9/feed", ParseMode::Xml)
            .await;
        assert!(doc.is_none());
    }

    #[test]
    fn test_invalid_user_agent_is_config_error() {
        let settings = ScraperSettings {
            user_agent: "bad\nagent".to_string(),
            ..ScraperSettings::default()
        };
        let err = HttpFetcher::new(&settings).unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
