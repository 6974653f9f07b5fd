//! # ByteBrief
//!
//! Collects news articles from publisher RSS feeds, enriches each item with
//! text extracted from its article page, and saves the results as JSON.
//!
//! ## Usage
//!
//! ```sh
//! bytebrief --config config/news_sources.yaml -o ./output
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: load `news_sources.yaml`; any problem is fatal here
//! 2. **Feeds**: fetch and parse each source's RSS feed, capped per source
//! 3. **Articles**: fetch each item's page and run the selector fallback
//!    chains, falling back to the feed description
//! 4. **Output**: write one pretty-printed JSON array
//!
//! Sources run one at a time unless `--concurrency` says otherwise; items
//! within a source are always sequential and rate limited.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod extract;
mod feed;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod rate_limit;
mod scrapers;
mod utils;

use cli::Cli;
use config::load_config;
use fetcher::HttpFetcher;
use models::Article;
use outputs::json;
use pipeline::ArticlePipeline;
use rate_limit::RateLimiter;
use utils::{ensure_writable_dir, truncate_for_log};

fn log_sample(article: &Article) {
    info!(
        title = %article.title,
        url = %article.url,
        source = %article.source,
        author = article.author.as_deref().unwrap_or("-"),
        published = %article.published_date.as_ref().map(ToString::to_string).unwrap_or_default(),
        scraped = %article.scraped_date.to_rfc3339(),
        preview = %truncate_for_log(&article.content, 200),
        "Sample article"
    );
}

#[tokio::main]
#[instrument]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("bytebrief starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration: fatal before any network activity ----
    let config = match load_config(Path::new(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config, error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    let sources = config.select(&args.sources)?;
    info!(
        sources = sources.len(),
        configured = config.sources.len(),
        concurrency = args.concurrency,
        "Sources selected"
    );

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // ---- Shutdown on Ctrl-C, keeping what was already scraped ----
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing with the articles scraped so far");
            let _ = shutdown_tx.send(true);
        }
    });

    // ---- Scrape ----
    let fetcher = match HttpFetcher::new(&config.settings) {
        Ok(fetcher) => fetcher,
        Err(e) if e.is_config() => {
            error!(error = %e, "Invalid scraper settings");
            return Err(e.into());
        }
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return Err(e.into());
        }
    };
    let rate_limiter = RateLimiter::new(config.settings.default_rate_limit(), &config.sources);
    let pipeline = ArticlePipeline::new(fetcher, rate_limiter).with_shutdown(shutdown_rx);

    let runs = pipeline.run_all(&sources, usize::from(args.concurrency)).await;
    for run in &runs {
        info!(source = %run.source_id, count = run.articles.len(), "Source finished");
    }
    let articles: Vec<Article> = runs.into_iter().flat_map(|run| run.articles).collect();
    info!(count = articles.len(), "Total articles scraped");

    let Some(first) = articles.first() else {
        warn!("No articles were scraped; nothing to save");
        return Ok(ExitCode::FAILURE);
    };
    log_sample(first);

    // ---- Output ----
    let filename = args.output_file.clone().unwrap_or_else(json::default_filename);
    let path = json::write_articles(&articles, &args.output_dir, &filename).await?;

    let elapsed = start_time.elapsed();
    info!(
        path = %path.display(),
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(ExitCode::SUCCESS)
}
