//! Selector fallback chains over parsed HTML.
//!
//! Publishers reshuffle their markup often, so each field is described by an
//! ordered list of CSS selectors. The chain is evaluated lazily: the first
//! selector that matches at least one element decides the result and the
//! remaining selectors are never tried. A chain that matches nothing yields
//! `None`, which is an expected outcome and only logged at debug level.

use crate::error::ScrapeError;
use crate::utils::normalize_whitespace;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use tracing::debug;

/// Separator between paragraphs of extracted article content.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
struct Rule {
    raw: String,
    selector: Selector,
}

/// An ordered list of compiled CSS selectors, earliest preferred.
#[derive(Debug, Clone, Default)]
pub struct SelectorChain {
    rules: Vec<Rule>,
}

impl SelectorChain {
    /// Compile a chain from selector strings.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] naming the first selector that is not
    /// valid CSS.
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ScrapeError> {
        let rules = selectors
            .iter()
            .map(|s| {
                let raw = s.as_ref().trim();
                Selector::parse(raw)
                    .map(|selector| Rule {
                        raw: raw.to_string(),
                        selector,
                    })
                    .map_err(|e| ScrapeError::Config(format!("invalid CSS selector '{raw}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Elements of the first selector in the chain that matches anything.
    fn first_match<'a>(&self, document: &'a Html) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.rules.iter().find_map(|rule| {
            let elements: Vec<ElementRef<'a>> = document.select(&rule.selector).collect();
            if elements.is_empty() {
                None
            } else {
                Some((rule.raw.as_str(), elements))
            }
        })
    }
}

impl fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raws: Vec<&str> = self.rules.iter().map(|r| r.raw.as_str()).collect();
        write!(f, "[{}]", raws.join(", "))
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first element matched by the chain.
///
/// Returns `None` when nothing matches or the winning element has no text.
pub fn extract_text(document: &Html, chain: &SelectorChain) -> Option<String> {
    let Some((selector, elements)) = chain.first_match(document) else {
        debug!(%chain, "No selector in chain matched");
        return None;
    };
    let text = element_text(&elements[0]);
    if text.is_empty() {
        debug!(selector, "Matched element has no text");
        return None;
    }
    Some(text)
}

/// Attribute value of the first element matched by the chain.
///
/// Returns `None` when nothing matches or the winning element lacks the
/// attribute.
pub fn extract_attribute(document: &Html, chain: &SelectorChain, attribute: &str) -> Option<String> {
    let Some((selector, elements)) = chain.first_match(document) else {
        debug!(%chain, attribute, "No selector in chain matched");
        return None;
    };
    match elements[0].value().attr(attribute).map(str::trim) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            debug!(selector, attribute, "Matched element lacks attribute");
            None
        }
    }
}

/// Up to `limit` paragraphs from the first selector that matches, joined by
/// [`PARAGRAPH_SEPARATOR`].
///
/// Empty paragraphs are dropped. Returns `None` when nothing matches or all
/// matched paragraphs are empty.
pub fn extract_paragraphs(document: &Html, chain: &SelectorChain, limit: usize) -> Option<String> {
    let Some((selector, elements)) = chain.first_match(document) else {
        debug!(%chain, "No content selector matched");
        return None;
    };
    let paragraphs: Vec<String> = elements
        .iter()
        .take(limit)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        debug!(selector, "Matched paragraphs are empty");
        return None;
    }
    debug!(selector, count = paragraphs.len(), "Extracted paragraphs");
    Some(paragraphs.join(PARAGRAPH_SEPARATOR))
}
