//! Roster module for paging through the roster site
//!
//! This module contains:
//! - Record, movement type and recency window types
//! - HTML parsers for listing, name and alliance pages
//! - URL construction for the roster site and killboard
//! - The paginated extractor

mod extractor;
mod parser;
mod types;
mod urls;

pub use extractor::{ExtractionRun, PaginatedExtractor, StopReason, DEFAULT_POLITE_DELAY};
pub use parser::{
    extract_corporation_ids, extract_heading_name, extract_records, HtmlRosterParser,
    RosterParser,
};
pub use types::{parse_roster_timestamp, MovementType, PageResult, RecencyWindow, RosterRecord};
pub use urls::SiteUrls;

use thiserror::Error;

/// Errors raised while parsing roster markup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A roster entry had a name but no usable character id
    #[error("Roster entry '{name}' has no character id in '{href}'")]
    MissingIdentifier { name: String, href: String },

    #[error("Invalid selector {0}")]
    Selector(String),
}
