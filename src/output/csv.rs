//! CSV export and import of member lists
//!
//! # Format
//!
//! - Header line unquoted, in the fixed column order of `CSV_HEADERS`
//! - Every data field quoted, embedded quotes doubled
//! - `\n` line terminator, embedded newlines written as-is
//! - Absent values are empty strings

use crate::output::{OutputError, OutputResult};
use crate::recruit::MemberRow;
use crate::roster::MovementType;
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of exported member lists
pub const CSV_HEADERS: [&str; 9] = [
    "Name",
    "CorpName",
    "DestroyedShips",
    "Efficiency",
    "DateLeft",
    "EveWhoLink",
    "ZKillboardLink",
    "Id",
    "CorpId",
];

/// One parsed data row keyed by header
pub type CsvRow = BTreeMap<String, String>;

/// A parsed CSV file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub data: Vec<CsvRow>,
}

impl CsvTable {
    /// First `n` data rows
    pub fn preview(&self, n: usize) -> &[CsvRow] {
        &self.data[..n.min(self.data.len())]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `{prefix with spaces replaced by _}_{movement}_members.csv`
pub fn make_csv_file_name(prefix: &str, movement: MovementType) -> String {
    format!(
        "{}_{}_members.csv",
        prefix.split(' ').collect::<Vec<_>>().join("_"),
        movement.as_str()
    )
}

/// Returns true if `name` names a file directly inside a directory
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

fn member_fields(row: &MemberRow) -> [String; 9] {
    [
        row.name.clone(),
        row.corp_name.clone(),
        row.destroyed_ships_text(),
        row.efficiency_text(),
        row.date_left.clone().unwrap_or_default(),
        row.eve_who_link.clone(),
        row.zkillboard_link.clone(),
        row.id.clone(),
        row.corp_id.clone(),
    ]
}

/// Serializes member rows into CSV text
pub fn render_members_csv(rows: &[MemberRow]) -> OutputResult<String> {
    let mut out = Vec::new();

    {
        let mut header = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut out);
        header.write_record(CSV_HEADERS)?;
        header.flush()?;
    }

    {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut out);
        for row in rows {
            writer.write_record(member_fields(row))?;
        }
        writer.flush()?;
    }

    String::from_utf8(out).map_err(|e| OutputError::Format(e.to_string()))
}

/// Writes member rows to `dir/file_name`
///
/// # Returns
///
/// * `Ok(Some(path))` - File written
/// * `Ok(None)` - No rows, nothing written
/// * `Err(OutputError)` - Failed to write the file
pub fn save_members_csv(
    dir: &Path,
    file_name: &str,
    rows: &[MemberRow],
) -> OutputResult<Option<PathBuf>> {
    if rows.is_empty() {
        tracing::info!("No members to save, skipping {}", file_name);
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let mut file = std::fs::File::create(&path)?;
    file.write_all(render_members_csv(rows)?.as_bytes())?;
    tracing::info!("Saved {} members to {}", rows.len(), path.display());

    Ok(Some(path))
}

/// Parses CSV text into a header list and rows keyed by header
///
/// Values are trimmed, short rows are padded with empty values and rows
/// whose values are all empty are skipped.
pub fn parse_csv(text: &str) -> OutputResult<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut data = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }

        let row: CsvRow = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = record.get(i).unwrap_or_default().trim().to_string();
                (header.clone(), value)
            })
            .collect();
        data.push(row);
    }

    Ok(CsvTable { headers, data })
}

/// Reads and parses a CSV file
pub fn read_csv_file(path: &Path) -> OutputResult<CsvTable> {
    let text = std::fs::read_to_string(path)?;
    parse_csv(&text)
}

/// Names of the `.csv` files in `dir`, sorted
///
/// A missing directory lists as empty.
pub fn list_csv_files(dir: &Path) -> OutputResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".csv"))
        .collect();
    names.sort();

    Ok(names)
}
