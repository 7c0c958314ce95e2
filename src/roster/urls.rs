//! URL construction for the roster site and the killboard
//!
//! These paths must match the scraped origins exactly.

use crate::config::ExtractorConfig;
use crate::roster::types::MovementType;

/// Origins of the two scraped sites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    roster_origin: String,
    killboard_origin: String,
}

impl SiteUrls {
    /// Creates the URL builder; trailing slashes on the origins are dropped
    pub fn new(roster_origin: &str, killboard_origin: &str) -> Self {
        Self {
            roster_origin: roster_origin.trim_end_matches('/').to_string(),
            killboard_origin: killboard_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(&config.roster_origin, &config.killboard_origin)
    }

    /// `{origin}/pug/list/{collectionId}/{movementType}/{pageNumber}`
    pub fn roster_page(&self, collection_id: &str, movement: MovementType, page: u32) -> String {
        format!(
            "{}/pug/list/{}/{}/{}",
            self.roster_origin,
            collection_id,
            movement.as_str(),
            page
        )
    }

    /// `{origin}/corporation/{corporationId}`
    pub fn corporation(&self, corporation_id: &str) -> String {
        format!("{}/corporation/{}", self.roster_origin, corporation_id)
    }

    /// `{origin}/alliance/{allianceId}`
    pub fn alliance(&self, alliance_id: &str) -> String {
        format!("{}/alliance/{}", self.roster_origin, alliance_id)
    }

    /// Roster-site profile of a character
    pub fn character(&self, character_id: &str) -> String {
        format!("{}/character/{}", self.roster_origin, character_id)
    }

    /// `{killboardOrigin}/character/{recordId}`
    pub fn killboard_character(&self, character_id: &str) -> String {
        format!("{}/character/{}", self.killboard_origin, character_id)
    }
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}
