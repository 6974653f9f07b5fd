//! RSS feed parsing.
//!
//! Streams the feed with `quick-xml` and turns each `<item>` into a
//! [`FeedItem`]. Items without a title or link are skipped (and don't count
//! toward the cap), title, author and description are reduced to plain text
//! (entities the XML layer leaves behind are decoded too), and `pubDate` is
//! parsed when possible and otherwise kept verbatim.

use crate::error::ScrapeError;
use crate::models::{FeedItem, PublishedDate};
use crate::utils::strip_html;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    Author,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            b"author" | b"dc:creator" => Some(Field::Author),
            _ => None,
        }
    }
}

/// Text collected for one `<item>` before validation.
#[derive(Debug, Default)]
struct ItemDraft {
    title: String,
    link: String,
    description: String,
    pub_date: String,
    author: String,
}

impl ItemDraft {
    fn push(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
            Field::Author => &mut self.author,
        };
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }

    /// `None` when the item lacks a title or link.
    fn finish(self) -> Option<FeedItem> {
        let title = strip_html(&self.title);
        let link = self.link.trim().to_string();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        let pub_date = Some(self.pub_date.trim())
            .filter(|raw| !raw.is_empty())
            .map(PublishedDate::parse);
        let author = Some(strip_html(&self.author)).filter(|a| !a.is_empty());
        Some(FeedItem {
            title,
            link,
            description: strip_html(&self.description),
            pub_date,
            author,
        })
    }
}

/// `href` of an Atom-style `<link href="..."/>`.
fn href_of(e: &BytesStart<'_>) -> Option<String> {
    e.try_get_attribute("href")
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|href| !href.is_empty())
}

/// Parse an RSS document into at most `item_cap` valid items, in feed order.
///
/// # Errors
///
/// Returns [`ScrapeError::FeedParse`] when the XML is malformed before the
/// cap is reached. Invalid individual items are skipped, not errors.
pub fn parse_feed(xml: &str, item_cap: usize) -> Result<Vec<FeedItem>, ScrapeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut skipped = 0usize;
    let mut draft: Option<ItemDraft> = None;
    // Element depth below the current <item>, and the field being read with its depth.
    let mut depth = 0usize;
    let mut field: Option<(Field, usize)> = None;

    if item_cap == 0 {
        return Ok(items);
    }

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if draft.is_none() {
                    if e.name().as_ref() == b"item" {
                        draft = Some(ItemDraft::default());
                        depth = 0;
                        field = None;
                    }
                    continue;
                }
                depth += 1;
                if field.is_none() && depth == 1 {
                    field = Field::from_tag(e.name().as_ref()).map(|f| (f, depth));
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(d) = draft.as_mut() {
                    if depth == 0 && e.name().as_ref() == b"link" && d.link.is_empty() {
                        if let Some(href) = href_of(&e) {
                            d.link = href;
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                if draft.is_none() {
                    continue;
                }
                if depth == 0 && e.name().as_ref() == b"item" {
                    let Some(finished) = draft.take() else {
                        continue;
                    };
                    match finished.finish() {
                        Some(item) => {
                            items.push(item);
                            if items.len() >= item_cap {
                                break;
                            }
                        }
                        None => {
                            skipped += 1;
                            warn!(position = reader.buffer_position(), "Skipping item - missing title or link");
                        }
                    }
                    continue;
                }
                if matches!(field, Some((_, d)) if d == depth) {
                    field = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                if let (Some(d), Some((f, _))) = (draft.as_mut(), field) {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e.as_ref()).into_owned());
                    d.push(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(d), Some((f, _))) = (draft.as_mut(), field) {
                    d.push(f, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScrapeError::FeedParse(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    debug!(parsed = items.len(), skipped, item_cap, "Parsed feed items");
    Ok(items)
}
