//! Utility functions for text cleanup, log formatting, and file system checks.
//!
//! - Whitespace normalization and HTML tag stripping for extracted text
//! - String truncation for log previews
//! - Output directory validation

use crate::error::ScrapeError;
use scraper::Html;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce feed text that may carry markup or character references to plain text.
///
/// The input is parsed as an HTML fragment, so tags disappear and every
/// named or numeric entity is decoded. Text nodes are joined with a space so
/// adjacent blocks don't run together, then whitespace is normalized.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
/// ```
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    normalize_whitespace(&text)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` characters with an ellipsis and
/// the remaining byte count appended. Cuts on a char boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Create `path` if needed and prove it is writable with a throwaway marker file.
///
/// # Errors
///
/// [`ScrapeError::Output`] naming the directory or marker file that failed.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), ScrapeError> {
    let output_err = |target: &Path, source: std::io::Error| ScrapeError::Output {
        path: target.display().to_string(),
        source,
    };
    let dir = Path::new(path);
    fs::create_dir_all(dir).await.map_err(|e| output_err(dir, e))?;

    let marker = dir.join(".bytebrief_write_check");
    fs::write(&marker, b"").await.map_err(|e| output_err(&marker, e))?;
    if let Err(e) = fs::remove_file(&marker).await {
        warn!(marker = %marker.display(), error = %e, "Could not remove write check file");
    }
    info!("Output directory is writable");
    Ok(())
}
