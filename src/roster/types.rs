//! Roster record and filtering types
//!
//! The values the extractor passes around: the movement type selecting a
//! roster sub-listing, one parsed roster row, the parsed outcome of a page,
//! and the recency window used to filter rows.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which roster sub-listing to page through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Characters who left the collection
    #[default]
    Departed,

    /// Characters currently in the collection
    Current,

    /// Characters who recently joined
    Joined,
}

impl MovementType {
    /// Path segment used in roster URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Departed => "departed",
            Self::Current => "current",
            Self::Joined => "joined",
        }
    }

    /// Returns true if a recency window is meaningful for this listing
    ///
    /// Only departures carry a usable timestamp on the roster site.
    pub fn uses_recency_window(&self) -> bool {
        matches!(self, Self::Departed)
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "departed" => Ok(Self::Departed),
            "current" => Ok(Self::Current),
            "joined" => Ok(Self::Joined),
            other => Err(format!(
                "Invalid type '{}'. Valid types are: departed, current, joined",
                other
            )),
        }
    }
}

/// One row of a roster listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    /// Character id
    pub id: String,

    /// Display name
    pub name: String,

    /// Departure/arrival timestamp exactly as the roster shows it
    pub moved_at: Option<String>,
}

impl RosterRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, moved_at: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            moved_at,
        }
    }

    /// The movement timestamp, if present and parseable
    pub fn moved_at_time(&self) -> Option<NaiveDateTime> {
        self.moved_at.as_deref().and_then(parse_roster_timestamp)
    }
}

/// Parses the timestamp formats the roster site uses
///
/// Accepts `YYYY/MM/DD HH:MM[:SS]`, the same with dashes, or a bare date
/// (read as midnight). Times are taken as UTC.
pub fn parse_roster_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.trim().replace('/', "-");

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parsed outcome of one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Records in page order
    pub records: Vec<RosterRecord>,

    /// Whether the page carried any records before filtering
    pub had_records: bool,
}

impl PageResult {
    pub fn new(records: Vec<RosterRecord>) -> Self {
        let had_records = !records.is_empty();
        Self {
            records,
            had_records,
        }
    }
}

/// Number of days a movement may lie in the past and still be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    days: u32,
}

impl RecencyWindow {
    /// A window of `days` days; `0` means no filtering
    pub fn days(days: u32) -> Option<Self> {
        (days > 0).then_some(Self { days })
    }

    pub fn len_days(&self) -> u32 {
        self.days
    }

    /// Returns true if the record moved within the window ending at `now`
    ///
    /// Records without a usable timestamp are rejected.
    pub fn accepts(&self, record: &RosterRecord, now: NaiveDateTime) -> bool {
        match record.moved_at_time() {
            Some(moved_at) => now - moved_at <= chrono::Duration::days(i64::from(self.days)),
            None => false,
        }
    }

    /// Keeps the records this window accepts, in order
    pub fn filter(&self, records: Vec<RosterRecord>, now: NaiveDateTime) -> Vec<RosterRecord> {
        records
            .into_iter()
            .filter(|record| self.accepts(record, now))
            .collect()
    }
}
