//! News source configuration.
//!
//! The config file is YAML with a global `scraper_config` block and an
//! ordered `news_sources` map keyed by source id. Loading resolves every
//! per-source value against the global defaults and the strategy registry,
//! and compiles each selector chain, so that everything downstream works on
//! a read-only, fully validated [`SourceConfig`].
//!
//! Any problem here is a [`ScrapeError`] configuration error and aborts the
//! run before a single request is made.

use crate::error::ScrapeError;
use crate::extract::SelectorChain;
use crate::scrapers::{strategy_for, ExtractionStrategy};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/news_sources.yaml";
pub const DEFAULT_USER_AGENT: &str = "ByteBrief/1.0";

/// Global scraper settings (`scraper_config` block).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout: f64,
    /// Additional attempts after the first failed request.
    pub retries: u32,
    /// Post-item delay in seconds for sources without their own `rate_limit`.
    pub default_rate_limit: f64,
    /// Retry `n` waits `n * backoff_unit` seconds.
    pub backoff_unit: f64,
    /// Item cap for sources without their own `item_cap`.
    pub item_cap: usize,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: 10.0,
            retries: 3,
            default_rate_limit: 1.0,
            backoff_unit: 2.0,
            item_cap: 10,
        }
    }
}

/// Seconds as a `Duration`, saturating instead of panicking on values that
/// validation would have rejected.
fn saturating_secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

impl ScraperSettings {
    pub fn timeout(&self) -> Duration {
        saturating_secs(self.timeout)
    }

    pub fn backoff_unit(&self) -> Duration {
        saturating_secs(self.backoff_unit)
    }

    pub fn default_rate_limit(&self) -> Duration {
        saturating_secs(self.default_rate_limit)
    }
}

/// Selector fallback chains as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawSelectors {
    headline: Vec<String>,
    content: Vec<String>,
    author: Vec<String>,
    date: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSource {
    name: String,
    rss_feed: String,
    rate_limit: Option<f64>,
    timeout: Option<f64>,
    retries: Option<u32>,
    item_cap: Option<usize>,
    fetch_article_page: Option<bool>,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    selectors: RawSelectors,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    scraper_config: ScraperSettings,
    news_sources: serde_yaml::Mapping,
}

/// Compiled selector chains for each extractable field.
#[derive(Debug, Clone, Default)]
pub struct Selectors {
    pub headline: SelectorChain,
    pub content: SelectorChain,
    pub author: SelectorChain,
    pub date: SelectorChain,
}

impl Selectors {
    /// No chain has a rule, so an article page has nothing to offer.
    pub fn is_empty(&self) -> bool {
        [&self.headline, &self.content, &self.author, &self.date]
            .iter()
            .all(|chain| chain.is_empty())
    }
}

/// Fully resolved, read-only descriptor of one publisher.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Key under `news_sources`; used for strategy lookup and rate limiting.
    pub id: String,
    /// Display name stamped on every article.
    pub name: String,
    pub rss_feed: String,
    /// Explicit post-item delay, if the source sets one.
    pub rate_limit: Option<Duration>,
    pub timeout: Duration,
    pub retries: u32,
    pub item_cap: usize,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub selectors: Selectors,
    pub strategy: ExtractionStrategy,
}

/// The whole config file after validation.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub settings: ScraperSettings,
    /// Sources in file order.
    pub sources: Vec<SourceConfig>,
}

impl NewsConfig {
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Pick the sources to run. An empty request means all of them.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] for an unknown source id.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&SourceConfig>, ScrapeError> {
        if ids.is_empty() {
            return Ok(self.sources.iter().collect());
        }
        ids.iter()
            .unique()
            .map(|id| {
                self.source(id).ok_or_else(|| {
                    let known = self.sources.iter().map(|s| s.id.as_str()).join(", ");
                    ScrapeError::Config(format!("unknown source '{id}' (configured: {known})"))
                })
            })
            .collect()
    }
}

/// Load and validate the news source configuration from a YAML file.
///
/// # Errors
///
/// Returns a configuration [`ScrapeError`] if the file cannot be read, parsed,
/// or fails validation.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<NewsConfig, ScrapeError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScrapeError::ConfigIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = parse_config(&content)?;
    info!(sources = config.sources.len(), "Loaded news source configuration");
    Ok(config)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns a configuration [`ScrapeError`] on malformed YAML, missing
/// required keys, or invalid values.
pub fn parse_config(yaml: &str) -> Result<NewsConfig, ScrapeError> {
    let raw: RawConfig = serde_yaml::from_str(yaml)?;
    validate_settings(&raw.scraper_config)?;

    if raw.news_sources.is_empty() {
        return Err(ScrapeError::Config("no news_sources configured".to_string()));
    }

    let sources = raw
        .news_sources
        .into_iter()
        .map(|(key, value)| {
            let id = key
                .as_str()
                .ok_or_else(|| ScrapeError::Config("news_sources keys must be strings".to_string()))?
                .to_string();
            let source: RawSource = serde_yaml::from_value(value).map_err(|e| {
                ScrapeError::Config(format!("source '{id}': {e}"))
            })?;
            resolve_source(id, source, &raw.scraper_config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NewsConfig {
        settings: raw.scraper_config,
        sources,
    })
}

fn validate_settings(settings: &ScraperSettings) -> Result<(), ScrapeError> {
    if settings.user_agent.trim().is_empty() {
        return Err(ScrapeError::Config("user_agent must be non-empty".to_string()));
    }
    check_seconds("timeout", settings.timeout, false).map_err(ScrapeError::Config)?;
    check_seconds("default_rate_limit", settings.default_rate_limit, true)
        .map_err(ScrapeError::Config)?;
    check_seconds("backoff_unit", settings.backoff_unit, true).map_err(ScrapeError::Config)?;
    if settings.item_cap == 0 {
        return Err(ScrapeError::Config("item_cap must be at least 1".to_string()));
    }
    Ok(())
}

/// Convert a seconds value, rejecting negatives, NaN, values too large for a
/// `Duration`, and (unless `allow_zero`) zero.
fn check_seconds(field: &str, value: f64, allow_zero: bool) -> Result<Duration, String> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if allow_zero || !duration.is_zero() => Ok(duration),
        _ => Err(format!(
            "{field} must be a {} number of seconds, got {value}",
            if allow_zero { "non-negative" } else { "positive" }
        )),
    }
}

fn resolve_source(
    id: String,
    raw: RawSource,
    settings: &ScraperSettings,
) -> Result<SourceConfig, ScrapeError> {
    let context = |msg: String| ScrapeError::Config(format!("source '{id}': {msg}"));

    if raw.name.trim().is_empty() {
        return Err(context("name must be non-empty".to_string()));
    }

    let feed_url = Url::parse(raw.rss_feed.trim())
        .map_err(|e| context(format!("invalid rss_feed '{}': {e}", raw.rss_feed)))?;
    if !matches!(feed_url.scheme(), "http" | "https") {
        return Err(context(format!("rss_feed must be http(s), got '{}'", raw.rss_feed)));
    }

    let rate_limit = raw
        .rate_limit
        .map(|secs| check_seconds("rate_limit", secs, true))
        .transpose()
        .map_err(context)?;
    let timeout = raw.timeout.unwrap_or(settings.timeout);
    let timeout = check_seconds("timeout", timeout, false).map_err(context)?;

    let item_cap = raw.item_cap.unwrap_or(settings.item_cap);
    if item_cap == 0 {
        return Err(context("item_cap must be at least 1".to_string()));
    }

    let mut strategy = strategy_for(&id);
    if let Some(fetch) = raw.fetch_article_page {
        strategy.fetch_article_page = fetch;
    }

    let in_source = |err: ScrapeError| match err {
        ScrapeError::Config(msg) => context(msg),
        other => other,
    };
    let compile = |chain: &[String]| SelectorChain::parse(chain).map_err(in_source);
    let content = if raw.selectors.content.is_empty() {
        SelectorChain::parse(strategy.default_content_selectors).map_err(in_source)?
    } else {
        compile(&raw.selectors.content)?
    };
    let selectors = Selectors {
        headline: compile(&raw.selectors.headline)?,
        content,
        author: compile(&raw.selectors.author)?,
        date: compile(&raw.selectors.date)?,
    };

    debug!(
        source = %id,
        item_cap,
        retries = raw.retries.unwrap_or(settings.retries),
        fetch_article_page = strategy.fetch_article_page,
        content_selectors = selectors.content.len(),
        "Resolved source configuration"
    );

    Ok(SourceConfig {
        name: raw.name.trim().to_string(),
        rss_feed: feed_url.to_string(),
        rate_limit,
        timeout,
        retries: raw.retries.unwrap_or(settings.retries),
        item_cap,
        category: raw.category,
        tags: raw.tags,
        selectors,
        strategy,
        id,
    })
}
