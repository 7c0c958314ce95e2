//! Credentials for the game's mail API
//!
//! Token acquisition happens elsewhere; this module only consumes bearer
//! tokens and reads the character id out of their JWT payload.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while obtaining or inspecting credentials
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("No access token configured")]
    MissingToken,

    #[error("Access token is not a JWT")]
    Malformed,

    #[error("Failed to decode token payload: {0}")]
    Decode(String),

    #[error("Token subject '{0}' does not name a character")]
    Subject(String),

    #[error("Token cannot be refreshed")]
    RefreshUnsupported,

    #[error("Token refresh failed: {0}")]
    Refresh(String),
}

/// Source of bearer tokens for the mail API
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A token believed to be valid
    async fn access_token(&self) -> Result<String, CredentialError>;

    /// Obtains a new token after the current one was rejected
    async fn refresh(&self) -> Result<String, CredentialError>;

    /// Character the token belongs to
    fn character_id(&self) -> Result<String, CredentialError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Reads the character id from a token's `sub` claim
///
/// The subject has the form `CHARACTER:EVE:<id>`.
pub fn character_id_from_jwt(token: &str) -> Result<String, CredentialError> {
    let payload = token.split('.').nth(1).ok_or(CredentialError::Malformed)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CredentialError::Decode(e.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| CredentialError::Decode(e.to_string()))?;

    match claims.sub.split(':').nth(2) {
        Some(id) if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => Ok(id.to_string()),
        _ => Err(CredentialError::Subject(claims.sub)),
    }
}

/// A fixed bearer token
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
    character_id: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("character_id", &self.character_id)
            .finish_non_exhaustive()
    }
}

impl StaticCredentials {
    /// Wraps a token; the character id is decoded from it on demand
    pub fn new(token: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CredentialError::MissingToken);
        }
        Ok(Self {
            token,
            character_id: None,
        })
    }

    /// Uses an explicit character id instead of decoding it
    pub fn with_character_id(mut self, character_id: impl Into<String>) -> Self {
        self.character_id = Some(character_id.into());
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String, CredentialError> {
        Err(CredentialError::RefreshUnsupported)
    }

    fn character_id(&self) -> Result<String, CredentialError> {
        match &self.character_id {
            Some(id) => Ok(id.clone()),
            None => character_id_from_jwt(&self.token),
        }
    }
}
