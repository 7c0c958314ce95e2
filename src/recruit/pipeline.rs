//! Multi-corporation recruitment pipeline
//!
//! For every target corporation: resolve its name, page through its roster,
//! enrich each accepted member with killboard statistics and keep those that
//! clear the thresholds.

use crate::config::ExtractorConfig;
use crate::fetch::PageFetcher;
use crate::recruit::filter::Thresholds;
use crate::recruit::killboard::{KillStats, KillboardClient};
use crate::roster::{
    extract_corporation_ids, extract_heading_name, ExtractionRun, MovementType,
    PaginatedExtractor, RecencyWindow, RosterRecord, SiteUrls,
};
use crate::state::ProgressSink;
use crate::{Result, ScoutError};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Prefix used when neither a prefix nor an alliance name is known
pub const DEFAULT_FILE_PREFIX: &str = "extracted";

/// What to extract
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecruitRequest {
    /// Alliance whose corporations are extracted when no corp ids are given
    pub alliance_id: Option<String>,

    /// Explicit corporation ids
    pub corp_ids: Vec<String>,

    pub movement: MovementType,

    /// Recency window in days for departures; 0 or none accepts all
    pub days: Option<u32>,

    pub file_name_prefix: Option<String>,

    /// Alliance name to use instead of fetching it
    pub alliance_name: Option<String>,

    pub thresholds: Thresholds,
}

impl RecruitRequest {
    /// Window applied to each corporation's run
    pub fn window(&self) -> Option<RecencyWindow> {
        if self.movement.uses_recency_window() {
            self.days.and_then(RecencyWindow::days)
        } else {
            None
        }
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRow {
    pub name: String,
    pub corp_name: String,
    pub stats: KillStats,
    pub date_left: Option<String>,
    pub eve_who_link: String,
    pub zkillboard_link: String,
    pub id: String,
    pub corp_id: String,
}

impl MemberRow {
    fn from_record(record: RosterRecord, corp: &Corporation, stats: KillStats, urls: &SiteUrls) -> Self {
        Self {
            eve_who_link: urls.character(&record.id),
            zkillboard_link: urls.killboard_character(&record.id),
            name: record.name,
            corp_name: corp.name.clone(),
            stats,
            date_left: record.moved_at,
            id: record.id,
            corp_id: corp.id.clone(),
        }
    }

    /// Ships destroyed as shown in the CSV
    pub fn destroyed_ships_text(&self) -> String {
        self.stats
            .destroyed_ships
            .map(|n| n.to_string())
            .unwrap_or_default()
    }

    /// Efficiency as shown in the CSV
    pub fn efficiency_text(&self) -> String {
        self.stats.efficiency_text()
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitOutcome {
    /// File name prefix chosen for the run
    pub prefix: String,
    pub movement: MovementType,
    pub rows: Vec<MemberRow>,

    /// Corporations fully processed
    pub corporations_done: usize,
    pub corporations_total: usize,

    /// Cancellation cut the run short
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
struct Corporation {
    id: String,
    name: String,
}

/// Wraps a sink so every line names the corporation being worked on
struct CorpProgress<'a> {
    inner: &'a dyn ProgressSink,
    label: &'a str,
    index: usize,
    total: usize,
    corp_name: &'a str,
}

impl ProgressSink for CorpProgress<'_> {
    fn report(&self, message: &str) {
        self.inner.report(&format!(
            "[{}] extracting {}/{} corps [{}]: {}",
            self.label,
            self.index + 1,
            self.total,
            self.corp_name,
            message
        ));
    }

    fn position(&self, current: usize, total: usize) {
        self.inner.position(current, total);
    }
}

/// Runs extraction across corporations
#[derive(Debug)]
pub struct RecruitPipeline {
    extractor: PaginatedExtractor,
    killboard: KillboardClient,
    killboard_concurrency: usize,
}

impl RecruitPipeline {
    pub fn new(extractor: PaginatedExtractor, killboard_concurrency: usize) -> Self {
        let killboard =
            KillboardClient::new(extractor.fetcher().clone(), extractor.urls().clone());
        Self {
            extractor,
            killboard,
            killboard_concurrency: killboard_concurrency.max(1),
        }
    }

    /// Builds the extractor and killboard client from configuration
    pub fn from_config(fetcher: PageFetcher, config: &ExtractorConfig) -> Self {
        let extractor = PaginatedExtractor::new(fetcher, SiteUrls::from_config(config))
            .with_polite_delay(Duration::from_millis(config.polite_delay_ms));
        Self::new(extractor, config.killboard_concurrency)
    }

    fn fetcher(&self) -> &PageFetcher {
        self.extractor.fetcher()
    }

    fn urls(&self) -> &SiteUrls {
        self.extractor.urls()
    }

    /// Runs the whole pipeline
    ///
    /// # Errors
    ///
    /// * `MissingTarget` - Neither corporation ids nor an alliance id were given
    /// * `Fetch` - The alliance page could not be fetched
    /// * `NameUnresolved` - A corporation's name could not be resolved
    ///
    /// Failures while paging a roster or looking up kill statistics are not
    /// errors; the affected corporation contributes what was gathered.
    pub async fn run(
        &self,
        request: &RecruitRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RecruitOutcome> {
        progress.report("Initializing...");

        let (corp_ids, alliance_name) = self.resolve_target(request).await?;
        let prefix = request
            .file_name_prefix
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| alliance_name.clone())
            .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string());
        let label = alliance_name.unwrap_or_else(|| prefix.clone());

        let total = corp_ids.len();
        let window = request.window();
        let mut rows = Vec::new();
        let mut done = 0;
        let mut cancelled = false;

        tracing::info!(
            "Extracting {} members of {} corporations (window: {:?})",
            request.movement,
            total,
            window.map(|w| w.len_days())
        );

        for (index, corp_id) in corp_ids.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            progress.position(index, total);
            let corp = self.resolve_corporation(corp_id).await?;
            let corp_progress = CorpProgress {
                inner: progress,
                label: &label,
                index,
                total,
                corp_name: &corp.name,
            };
            corp_progress.report(&format!("Starting to extract {} members...", request.movement));

            let run = ExtractionRun::new(corp.id.clone(), request.movement, window);
            let run = self.extractor.run(run, &corp_progress, cancel).await;
            if matches!(run.stop_reason(), Some(crate::roster::StopReason::Cancelled)) {
                cancelled = true;
            }

            let records = run.into_records();
            corp_progress.report(&format!("Looking up kill statistics for {} characters", records.len()));
            let members = self.enrich(records, &corp).await;
            corp_progress.report(&format!("Found {} characters in {}", members.len(), corp.name));
            rows.extend(members);

            if cancelled {
                break;
            }
            done += 1;
            progress.position(done, total);
        }

        let before = rows.len();
        rows.retain(|row| request.thresholds.admits(&row.stats));
        if !request.thresholds.is_empty() {
            tracing::info!("{} of {} members clear the thresholds", rows.len(), before);
        }
        progress.report(&format!("Found {} worthy characters", rows.len()));

        Ok(RecruitOutcome {
            prefix,
            movement: request.movement,
            rows,
            corporations_done: done,
            corporations_total: total,
            cancelled,
        })
    }

    /// Corporation ids to extract and the alliance name, if known
    ///
    /// The alliance page is fetched at most once. It is required when no
    /// explicit ids are given; otherwise it only supplies a missing name.
    async fn resolve_target(
        &self,
        request: &RecruitRequest,
    ) -> Result<(Vec<String>, Option<String>)> {
        let explicit: Vec<String> = request
            .corp_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        let explicit_name = request.alliance_name.clone().filter(|n| !n.trim().is_empty());
        let alliance_id = request
            .alliance_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        if !explicit.is_empty() {
            if explicit_name.is_some() {
                return Ok((explicit, explicit_name));
            }
            let name = match alliance_id {
                Some(id) => match self.fetcher().fetch(&self.urls().alliance(id)).await {
                    Ok(html) => extract_heading_name(&html),
                    Err(e) => {
                        tracing::warn!("Could not fetch alliance {} name: {}", id, e);
                        None
                    }
                },
                None => None,
            };
            return Ok((explicit, name));
        }

        let alliance_id = alliance_id.ok_or(ScoutError::MissingTarget)?;
        let html = self.fetcher().fetch(&self.urls().alliance(alliance_id)).await?;
        let ids = extract_corporation_ids(&html);
        tracing::info!("Alliance {} lists {} corporations", alliance_id, ids.len());
        let name = explicit_name.or_else(|| extract_heading_name(&html));
        Ok((ids, name))
    }

    async fn resolve_corporation(&self, corp_id: &str) -> Result<Corporation> {
        let url = self.urls().corporation(corp_id);
        let html = self.fetcher().fetch(&url).await?;
        let name = extract_heading_name(&html).ok_or(ScoutError::NameUnresolved { url })?;
        Ok(Corporation {
            id: corp_id.to_string(),
            name,
        })
    }

    /// Looks up kill statistics with bounded concurrency, keeping record order
    async fn enrich(&self, records: Vec<RosterRecord>, corp: &Corporation) -> Vec<MemberRow> {
        stream::iter(records)
            .map(|record| async move {
                let stats = self.killboard.stats_for(&record.id).await;
                MemberRow::from_record(record, corp, stats, self.urls())
            })
            .buffered(self.killboard_concurrency)
            .collect()
            .await
    }
}
