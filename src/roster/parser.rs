//! HTML parsers for roster site pages
//!
//! This module handles parsing roster markup to extract:
//! - Character rows (id, name, departure/arrival marker)
//! - The collection display name (first `h4`)
//! - Corporation ids linked from an alliance page

use crate::roster::types::{PageResult, RosterRecord};
use crate::roster::ParseError;
use scraper::{ElementRef, Html, Selector};

/// Turns a listing page's markup into records
///
/// Implementations must preserve document order.
pub trait RosterParser: Send + Sync {
    fn parse_page(&self, html: &str) -> Result<PageResult, ParseError>;
}

/// Parser for the roster site's listing markup
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRosterParser;

impl RosterParser for HtmlRosterParser {
    fn parse_page(&self, html: &str) -> Result<PageResult, ParseError> {
        extract_records(html).map(PageResult::new)
    }
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{}: {:?}", css, e)))
}

/// Extracts character rows from a listing page
///
/// # Extraction Rules
///
/// - Every `<a href="/character/<id>">` with non-empty text is a row
/// - Image-only links (no text) are skipped
/// - The row's timestamp is the text of the first following sibling
///   `<span class="departed">`, if any
///
/// # Returns
///
/// * `Ok(Vec<RosterRecord>)` - Rows in document order (possibly empty)
/// * `Err(ParseError)` - A named row carried no character id
///
/// # Example
///
/// ```
/// use roster_scout::roster::extract_records;
///
/// let html = r#"<div><a href="/character/42">Ana</a> <span class="departed">2024/06/05 10:00</span></div>"#;
/// let records = extract_records(html).unwrap();
/// assert_eq!(records[0].id, "42");
/// assert_eq!(records[0].moved_at.as_deref(), Some("2024/06/05 10:00"));
/// ```
pub fn extract_records(html: &str) -> Result<Vec<RosterRecord>, ParseError> {
    let document = Html::parse_document(html);
    let anchors = selector(r#"a[href^="/character/"]"#)?;
    let mut records = Vec::new();

    for anchor in document.select(&anchors) {
        let name = element_text(&anchor);
        if name.is_empty() {
            continue;
        }

        let href = anchor.value().attr("href").unwrap_or_default();
        let id = leading_digits(href.trim_start_matches("/character/"));
        if id.is_empty() {
            return Err(ParseError::MissingIdentifier {
                name,
                href: href.to_string(),
            });
        }

        records.push(RosterRecord::new(id, name, departed_marker(&anchor)));
    }

    Ok(records)
}

/// Returns the first heading-level-4 text of a page, if non-empty
pub fn extract_heading_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let heading = selector("h4").ok()?;

    document
        .select(&heading)
        .next()
        .map(|element| element_text(&element))
        .filter(|s| !s.is_empty())
}

/// Extracts the corporation ids linked from an alliance page
///
/// Ids are returned in document order without duplicates.
pub fn extract_corporation_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchors) = selector(r#"a[href^="/corporation/"]"#) else {
        return Vec::new();
    };

    let mut ids: Vec<String> = Vec::new();
    for anchor in document.select(&anchors) {
        let href = anchor.value().attr("href").unwrap_or_default();
        let id = leading_digits(href.trim_start_matches("/corporation/"));
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    ids
}

/// Text of the first `span.departed` after the anchor among its siblings
fn departed_marker(anchor: &ElementRef<'_>) -> Option<String> {
    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| {
            sibling.value().name() == "span"
                && sibling.value().classes().any(|class| class == "departed")
        })
        .map(|span| element_text(&span))
        .filter(|text| !text.is_empty())
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}
