//! Per-source retrieval and extraction pipeline.
//!
//! For one source the pipeline fetches the RSS feed, parses its items and
//! then, strictly one item at a time:
//!
//! 1. fetches the item's own page (when the source strategy allows it)
//! 2. extracts content, author and date through the source's selector chains
//! 3. falls back to the feed description when the page yields no content
//! 4. assembles an [`Article`] and waits out the source's rate limit
//!
//! Failures never abort a run. An unreachable or malformed feed yields no
//! articles for that source; an item that errors (or panics) is logged and
//! skipped. A shutdown signal stops the loop between items, or abandons the
//! in-flight item, and the articles gathered so far are returned.

use crate::config::SourceConfig;
use crate::error::ScrapeError;
use crate::extract::{extract_attribute, extract_paragraphs, extract_text};
use crate::feed::parse_feed;
use crate::fetcher::{Document, HttpFetcher, ParseMode};
use crate::models::{Article, FeedItem, PublishedDate};
use crate::rate_limit::RateLimiter;
use crate::utils::truncate_for_log;
use futures::future::{pending, FutureExt};
use futures::stream::{self, StreamExt};
use scraper::Html;
use std::panic::AssertUnwindSafe;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Articles produced for one source.
#[derive(Debug)]
pub struct SourceRun {
    pub source_id: String,
    pub articles: Vec<Article>,
}

/// Fields pulled from an article page.
#[derive(Debug, Default)]
struct PageFields {
    headline: Option<String>,
    content: Option<String>,
    author: Option<String>,
    date: Option<PublishedDate>,
}

impl PageFields {
    fn extract(html: &Html, source: &SourceConfig) -> Self {
        let chains = &source.selectors;
        let date = extract_attribute(html, &chains.date, "datetime")
            .or_else(|| extract_attribute(html, &chains.date, "content"))
            .or_else(|| extract_text(html, &chains.date))
            .map(|raw| PublishedDate::parse(&raw));
        Self {
            headline: extract_text(html, &chains.headline),
            content: extract_paragraphs(html, &chains.content, source.strategy.paragraph_limit),
            author: extract_text(html, &chains.author),
            date,
        }
    }
}

fn looks_truncated(title: &str) -> bool {
    title.ends_with('…') || title.ends_with("...")
}

/// Prefer a parsed date over a raw one, and the feed over the page.
fn pick_date(feed: Option<PublishedDate>, page: Option<PublishedDate>) -> Option<PublishedDate> {
    match (feed, page) {
        (Some(f), _) if f.is_parsed() => Some(f),
        (_, Some(p)) if p.is_parsed() => Some(p),
        (f, p) => f.or(p),
    }
}

/// Resolve an item link against the feed URL so relative links work.
fn resolve_link(feed_url: &str, link: &str) -> Result<String, ScrapeError> {
    let invalid = |reason: String| ScrapeError::InvalidLink {
        link: link.to_string(),
        reason,
    };
    let base = Url::parse(feed_url).map_err(|e| invalid(e.to_string()))?;
    let resolved = base.join(link).map_err(|e| invalid(e.to_string()))?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", resolved.scheme())));
    }
    Ok(resolved.to_string())
}

/// Combine feed metadata with whatever the article page yielded.
fn assemble(source: &SourceConfig, item: FeedItem, url: String, page: Option<PageFields>) -> Article {
    let page = page.unwrap_or_default();

    let title = match page.headline {
        Some(headline) if looks_truncated(&item.title) => headline,
        _ => item.title,
    };

    let content = match page.content {
        Some(content) => content,
        None => {
            debug!(%url, "Using feed description as content");
            item.description
        }
    };

    let feed_date = if source.strategy.parse_pub_date {
        item.pub_date
    } else {
        None
    };

    Article::new(title, content, url, source.name.clone())
        .with_author(page.author.or(item.author))
        .with_published_date(pick_date(feed_date, page.date))
        .with_category(source.category.clone())
        .with_tags(source.tags.clone())
}

/// Drives sources through fetch → parse → extract → rate limit.
///
/// Owns the HTTP fetcher (and its connection pool) and the rate limiter for
/// the whole run; nothing is shared through globals.
#[derive(Debug)]
pub struct ArticlePipeline {
    fetcher: HttpFetcher,
    rate_limiter: RateLimiter,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ArticlePipeline {
    pub fn new(fetcher: HttpFetcher, rate_limiter: RateLimiter) -> Self {
        Self {
            fetcher,
            rate_limiter,
            shutdown: None,
        }
    }

    /// Stop processing once `true` is sent on this channel.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once shutdown is requested; never resolves without a signal.
    async fn cancelled(&self) {
        let Some(rx) = self.shutdown.as_ref() else {
            return pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without signalling: nothing will ever cancel us.
                return pending().await;
            }
        }
    }

    /// Run several sources. `concurrency` bounds how many sources are in
    /// flight at once (1 = strictly sequential); results keep input order.
    pub async fn run_all(&self, sources: &[&SourceConfig], concurrency: usize) -> Vec<SourceRun> {
        stream::iter(sources.iter().copied())
            .map(|source| async move {
                SourceRun {
                    source_id: source.id.clone(),
                    articles: self.run(source).await,
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Scrape one source. Never fails; problems show up as fewer articles.
    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub async fn run(&self, source: &SourceConfig) -> Vec<Article> {
        let mut articles = Vec::new();
        if self.is_cancelled() {
            warn!("Shutdown requested; skipping source");
            return articles;
        }

        let fetcher = self.fetcher.with_policy(source.timeout, source.retries);
        info!(feed = %source.rss_feed, "Fetching RSS feed");
        let feed = tokio::select! {
            biased;
            _ = self.cancelled() => None,
            doc = fetcher.fetch(&source.rss_feed, ParseMode::Xml) => doc.and_then(Document::into_xml),
        };
        let Some(feed) = feed else {
            error!(feed = %source.rss_feed, "Failed to fetch RSS feed");
            return articles;
        };

        let items = match parse_feed(&feed, source.item_cap) {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to parse RSS feed");
                return articles;
            }
        };
        info!(count = items.len(), item_cap = source.item_cap, "Found items in RSS feed");

        for (index, item) in items.into_iter().enumerate() {
            if self.is_cancelled() {
                warn!(index, "Shutdown requested; stopping before next item");
                break;
            }

            let title = truncate_for_log(&item.title, 50);
            info!(index, %title, "Processing article");

            let work = AssertUnwindSafe(self.process_item(&fetcher, source, item)).catch_unwind();
            let outcome = tokio::select! {
                biased;
                _ = self.cancelled() => None,
                result = work => Some(result),
            };
            match outcome {
                None => {
                    warn!(index, %title, "Shutdown requested; abandoning in-flight item");
                    break;
                }
                Some(Ok(Ok(article))) => {
                    info!(index, %title, bytes = article.content.len(), "Scraped article");
                    articles.push(article);
                }
                Some(Ok(Err(e))) => {
                    error!(index, %title, error = %e, "Error processing item; continuing");
                }
                Some(Err(_panic)) => {
                    error!(index, %title, "Item processing panicked; continuing");
                }
            }

            tokio::select! {
                biased;
                _ = self.cancelled() => {
                    warn!("Shutdown requested during rate limit wait");
                    break;
                }
                _ = self.rate_limiter.apply(&source.id) => {}
            }
        }

        info!(count = articles.len(), "Source completed");
        articles
    }

    async fn process_item(
        &self,
        fetcher: &HttpFetcher,
        source: &SourceConfig,
        item: FeedItem,
    ) -> Result<Article, ScrapeError> {
        let url = resolve_link(&source.rss_feed, &item.link)?;

        let page = if source.strategy.fetch_article_page && !source.selectors.is_empty() {
            fetcher
                .fetch(&url, ParseMode::Html)
                .await
                .and_then(Document::into_html)
                .map(|html| PageFields::extract(&html, source))
        } else {
            None
        };
        if page.as_ref().is_some_and(|p| p.content.is_none()) {
            debug!(%url, "No content selector matched article page");
        }

        Ok(assemble(source, item, url, page))
    }
}
