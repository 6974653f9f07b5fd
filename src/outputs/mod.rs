//! Persistence of scraped articles.
//!
//! # Output Structure
//!
//! ```text
//! output/
//! ├── scraped_articles_20250506_143000.json
//! └── scraped_articles_20250506_183000.json
//! ```
//!
//! Each file is a pretty-printed JSON array of articles in pipeline order.

pub mod json;
