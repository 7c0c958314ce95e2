//! Configuration module for Roster-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use roster_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Pages are fetched from {}", config.extractor.roster_origin);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ExtractorConfig, FetcherConfig, MailConfig, OutputConfig, ServerConfig};

// Re-export parser functions
pub use parser::{apply_env_overrides, load_config, load_or_default, parse_config, TOKEN_ENV_VAR};
