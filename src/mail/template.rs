//! Mail templates with `%%KEY%%` placeholders

use crate::mail::MailError;
use crate::output::CsvRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Column holding the recipient's character id
pub const RECIPIENT_COLUMN: &str = "Id";

/// Subject and body with placeholders, plus user variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailTemplate {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// A rendered message for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub recipient_id: u64,

    /// Display name for progress lines
    pub recipient_name: String,

    pub subject: String,
    pub body: String,
}

impl MailTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Loads a template from a TOML file with `subject`, `body` and an
    /// optional `[variables]` table
    pub fn load(path: &Path) -> Result<Self, MailError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MailError::Template(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&text).map_err(|e| MailError::Template(format!("{}: {}", path.display(), e)))
    }

    /// Adds or replaces user variables
    pub fn with_variables<I>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.variables.extend(variables);
        self
    }

    /// Substitutes row columns, then user variables, in subject and body
    pub fn render_text(&self, text: &str, row: &CsvRow) -> String {
        let mut out = text.to_string();
        for (key, value) in row {
            out = out.replace(&format!("%%{}%%", key), value);
        }
        for (key, value) in &self.variables {
            out = out.replace(&format!("%%{}%%", key), value);
        }
        out
    }

    /// Builds the message for one CSV row
    ///
    /// # Errors
    ///
    /// `InvalidRecipient` if the row has no numeric `Id` column.
    pub fn render(&self, row: &CsvRow) -> Result<MailMessage, MailError> {
        let raw_id = row.get(RECIPIENT_COLUMN).map(String::as_str).unwrap_or("");
        let recipient_id = raw_id
            .trim()
            .parse::<u64>()
            .map_err(|_| MailError::InvalidRecipient {
                value: raw_id.to_string(),
            })?;

        Ok(MailMessage {
            recipient_id,
            recipient_name: row.get("Name").cloned().unwrap_or_else(|| raw_id.to_string()),
            subject: self.render_text(&self.subject, row),
            body: self.render_text(&self.body, row),
        })
    }
}

/// Parses `KEY=VALUE` pairs
pub fn parse_variable(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", pair)),
    }
}
