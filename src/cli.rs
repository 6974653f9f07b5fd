//! Command-line interface definitions for ByteBrief.

use crate::config::DEFAULT_CONFIG_PATH;
use crate::outputs::json::DEFAULT_OUTPUT_DIR;
use clap::Parser;

/// Scrape configured news sources and save the articles as JSON.
///
/// # Examples
///
/// ```sh
/// # Every configured source, default paths
/// bytebrief
///
/// # Only CNN, custom config and output
/// bytebrief --config ./news_sources.yaml -s cnn -o ./out
///
/// # Two sources in flight at once
/// bytebrief --concurrency 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the news source configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Only scrape these source ids (repeatable); defaults to all sources
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// Output directory for the JSON file
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: String,

    /// Output file name; defaults to scraped_articles_YYYYMMDD_HHMMSS.json
    #[arg(long)]
    pub output_file: Option<String>,

    /// How many sources to scrape at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,
}
