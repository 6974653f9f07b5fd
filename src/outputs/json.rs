//! JSON output of scraped articles.

use crate::error::ScrapeError;
use crate::models::Article;
use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// `scraped_articles_YYYYMMDD_HHMMSS.json` for the given moment.
pub fn filename_at<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("scraped_articles_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Default output filename, stamped with the local time.
pub fn default_filename() -> String {
    filename_at(&Local::now())
}

/// Write `articles` as a pretty-printed JSON array to `{output_dir}/{filename}`.
///
/// The directory is created if needed. Returns the path written.
///
/// # Errors
///
/// [`ScrapeError::Serialize`] if an article cannot be encoded, or
/// [`ScrapeError::Output`] if the directory or file cannot be written.
#[instrument(level = "info", skip(articles), fields(count = articles.len()))]
pub async fn write_articles(
    articles: &[Article],
    output_dir: &str,
    filename: &str,
) -> Result<PathBuf, ScrapeError> {
    let json = serde_json::to_string_pretty(articles)?;

    info!(%output_dir, "Ensuring output directory exists");
    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(ScrapeError::Output {
            path: output_dir.to_string(),
            source: e,
        });
    }

    let path = Path::new(output_dir).join(filename);
    info!(path = %path.display(), bytes = json.len(), "Writing JSON");
    fs::write(&path, json).await.map_err(|e| ScrapeError::Output {
        path: path.display().to_string(),
        source: e,
    })?;
    info!(path = %path.display(), "Wrote articles JSON");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PublishedDate;
    use chrono::Utc;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bytebrief_{name}_{}", std::process::id()))
    }

    #[test]
    fn filename_has_timestamp_shape() {
        let at = Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 5).unwrap();
        assert_eq!(filename_at(&at), "scraped_articles_20250506_143005.json");

        let name = default_filename();
        assert!(name.starts_with("scraped_articles_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "scraped_articles_YYYYMMDD_HHMMSS.json".len());
    }

    #[tokio::test]
    async fn writes_pretty_array_that_reads_back() {
        let dir = scratch_dir("write");
        let articles = vec![
            Article::new("One", "Body one", "https://example.com/1", "CNN")
                .with_published_date(Some(PublishedDate::parse("Tue, 06 May 2025 14:30:00 GMT"))),
            Article::new("Two", "Body two", "https://example.com/2", "CNN")
                .with_tags(vec!["world".to_string()]),
        ];

        let path = write_articles(&articles, dir.to_str().unwrap(), "out.json")
            .await
            .unwrap();
        assert_eq!(path, dir.join("out.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n"));
        let back: Vec<Article> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, articles);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn empty_run_writes_empty_array() {
        let dir = scratch_dir("empty");
        let path = write_articles(&[], dir.to_str().unwrap(), "none.json")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn unwritable_target_is_output_error() {
        let dir = scratch_dir("blocked");
        std::fs::create_dir_all(&dir).unwrap();
        // A regular file where the output directory should be.
        let blocker = dir.join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_articles(&[], blocker.to_str().unwrap(), "out.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Output { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
