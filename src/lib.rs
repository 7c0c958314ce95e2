//! Roster-Scout: a polite roster scraper and recruitment mailer
//!
//! This crate pages through public corporation rosters, filters members by how
//! recently they moved and by their kill statistics, writes the result to CSV,
//! and can later mail every listed character through the game's official API.

pub mod config;
pub mod fetch;
pub mod mail;
pub mod output;
pub mod recruit;
pub mod roster;
pub mod server;
pub mod state;

use thiserror::Error;

/// Main error type for Roster-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] roster::ParseError),

    #[error("Credential error: {0}")]
    Credential(#[from] mail::CredentialError),

    #[error("Mail error: {0}")]
    Mail(#[from] mail::MailError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not resolve a name from {url}")]
    NameUnresolved { url: String },

    #[error("Either an alliance id or corporation ids must be provided")]
    MissingTarget,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Roster-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchError, PageFetcher};
pub use roster::{ExtractionRun, MovementType, PaginatedExtractor, RecencyWindow, RosterRecord};
pub use state::{JobProgress, JobStatus, ProgressSink};
