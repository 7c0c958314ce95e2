//! Killboard statistics lookup
//!
//! Each character's profile on the killboard carries a stats box whose third
//! body row holds ships destroyed (cell 0) and efficiency (cell 4).

use crate::fetch::PageFetcher;
use crate::roster::SiteUrls;
use scraper::{Html, Selector};

/// Kill statistics of one character
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KillStats {
    pub destroyed_ships: Option<u64>,
    pub efficiency: Option<f64>,
}

impl KillStats {
    /// `"{n}%"`, or `"No Data"` when the killboard had nothing
    pub fn efficiency_text(&self) -> String {
        match self.efficiency {
            Some(efficiency) => format!("{}%", efficiency),
            None => "No Data".to_string(),
        }
    }
}

/// Reads kill statistics from a killboard character page
///
/// Missing rows, cells or unparseable numbers yield `None` for that field.
pub fn extract_kill_stats(html: &str) -> KillStats {
    let document = Html::parse_document(html);
    let (Ok(rows), Ok(cells)) = (
        Selector::parse("#statsbox tbody tr"),
        Selector::parse("td"),
    ) else {
        return KillStats::default();
    };

    let Some(row) = document.select(&rows).nth(2) else {
        return KillStats::default();
    };

    let texts: Vec<String> = row
        .select(&cells)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect();

    KillStats {
        destroyed_ships: texts.first().and_then(|s| parse_count(s)),
        efficiency: texts.get(4).and_then(|s| parse_percentage(s)),
    }
}

fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| *c != ',').collect();
    digits.trim().parse().ok()
}

fn parse_percentage(text: &str) -> Option<f64> {
    text.trim().trim_end_matches('%').trim().parse().ok()
}

/// Looks up kill statistics on the killboard
#[derive(Debug, Clone)]
pub struct KillboardClient {
    fetcher: PageFetcher,
    urls: SiteUrls,
}

impl KillboardClient {
    pub fn new(fetcher: PageFetcher, urls: SiteUrls) -> Self {
        Self { fetcher, urls }
    }

    /// Fetches a character's statistics; a failed lookup yields no data
    pub async fn stats_for(&self, character_id: &str) -> KillStats {
        let url = self.urls.killboard_character(character_id);
        match self.fetcher.fetch(&url).await {
            Ok(html) => extract_kill_stats(&html),
            Err(e) => {
                tracing::warn!("No killboard data for {}: {}", character_id, e);
                KillStats::default()
            }
        }
    }
}
