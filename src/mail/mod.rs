//! Mail module for messaging extracted members
//!
//! This module contains:
//! - The credential provider seam and a static bearer-token provider
//! - `%%KEY%%` mail templates
//! - The bulk sender

mod credentials;
mod sender;
mod template;

pub use credentials::{character_id_from_jwt, CredentialError, CredentialProvider, StaticCredentials};
pub use sender::{MailReport, MailSender};
pub use template::{parse_variable, MailMessage, MailTemplate, RECIPIENT_COLUMN};

use thiserror::Error;

/// Errors raised while rendering or sending mail
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Row has no valid character id (got '{value}')")]
    InvalidRecipient { value: String },

    #[error("Mail API rejected message to {recipient}: HTTP {status} {detail}")]
    Rejected {
        recipient: u64,
        status: u16,
        detail: String,
    },

    #[error("Mail API still rejects the token after a refresh")]
    Unauthorized,

    #[error("Template error: {0}")]
    Template(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}
