//! Output module for member lists and progress display
//!
//! This module handles:
//! - Writing member lists to CSV and reading CSV files back
//! - Listing the CSV files available for mailing
//! - Rendering job progress on the terminal

mod console;
pub mod csv;

pub use self::csv::{
    is_safe_file_name, list_csv_files, make_csv_file_name, parse_csv, read_csv_file,
    render_members_csv, save_members_csv, CsvRow, CsvTable, CSV_HEADERS,
};
pub use console::ConsoleProgress;

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
