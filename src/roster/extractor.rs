//! Paginated roster extractor
//!
//! Pages through `{origin}/pug/list/{id}/{movement}/{page}` one page at a
//! time, filters each page's records by the recency window and accumulates
//! the accepted ones.
//!
//! # Stop Conditions
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | HTTP 404 | End of pages, not an error |
//! | Page yields no accepted records | End of relevant pages |
//! | Rate limit / transient failure exhausted | Logged, partial results kept |
//! | Parse failure | Logged, partial results kept |
//! | Cancellation requested | Partial results kept |

use crate::fetch::{FetchError, PageFetcher, Sleeper};
use crate::roster::parser::{HtmlRosterParser, RosterParser};
use crate::roster::types::{MovementType, RecencyWindow, RosterRecord};
use crate::roster::urls::SiteUrls;
use crate::roster::ParseError;
use crate::state::ProgressSink;
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default pause between successive page requests
pub const DEFAULT_POLITE_DELAY: Duration = Duration::from_millis(700);

/// Why an extraction run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The roster answered 404 for the next page
    EndOfPages,

    /// A page produced no accepted records
    NoMatchingRecords { page: u32 },

    /// A fetch failed for good
    FetchFailed(FetchError),

    /// A page could not be parsed
    ParseFailed(ParseError),

    /// Cancellation was requested between pages
    Cancelled,
}

impl StopReason {
    /// Returns true if the run ended on a failure rather than running out of pages
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::ParseFailed(_))
    }
}

/// State of one extraction invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRun {
    collection_id: String,
    movement: MovementType,
    window: Option<RecencyWindow>,
    page: u32,
    accepted: Vec<RosterRecord>,
    stop_reason: Option<StopReason>,
}

impl ExtractionRun {
    /// A fresh run starting at page 1
    pub fn new(
        collection_id: impl Into<String>,
        movement: MovementType,
        window: Option<RecencyWindow>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            movement,
            window,
            page: 1,
            accepted: Vec::new(),
            stop_reason: None,
        }
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn movement(&self) -> MovementType {
        self.movement
    }

    pub fn window(&self) -> Option<RecencyWindow> {
        self.window
    }

    /// Page the run is on (or stopped on)
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Accepted records in page order
    pub fn accepted(&self) -> &[RosterRecord] {
        &self.accepted
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    pub fn into_records(self) -> Vec<RosterRecord> {
        self.accepted
    }

    fn accept(&mut self, records: Vec<RosterRecord>) {
        self.accepted.extend(records);
    }

    fn advance_page(&mut self) {
        self.page += 1;
    }

    fn stop(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
    }
}

/// Drives the fetcher across numbered roster pages
pub struct PaginatedExtractor {
    fetcher: PageFetcher,
    parser: Arc<dyn RosterParser>,
    urls: SiteUrls,
    polite_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for PaginatedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedExtractor")
            .field("fetcher", &self.fetcher)
            .field("urls", &self.urls)
            .field("polite_delay", &self.polite_delay)
            .finish_non_exhaustive()
    }
}

impl PaginatedExtractor {
    /// Creates an extractor using the HTML parser and the fetcher's sleeper
    pub fn new(fetcher: PageFetcher, urls: SiteUrls) -> Self {
        let sleeper = fetcher.sleeper();
        Self {
            fetcher,
            parser: Arc::new(HtmlRosterParser),
            urls,
            polite_delay: DEFAULT_POLITE_DELAY,
            sleeper,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn RosterParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_polite_delay(mut self, delay: Duration) -> Self {
        self.polite_delay = delay;
        self
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    pub fn urls(&self) -> &SiteUrls {
        &self.urls
    }

    /// Runs the page loop until a stop condition and returns the run
    ///
    /// Failures inside the loop never propagate; they end the run and are
    /// recorded as its stop reason.
    pub async fn run(
        &self,
        run: ExtractionRun,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ExtractionRun {
        self.run_at(run, progress, cancel, || Utc::now().naive_utc())
            .await
    }

    /// Same as `run` with an explicit clock for the recency window
    pub async fn run_at<F>(
        &self,
        mut run: ExtractionRun,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
        now: F,
    ) -> ExtractionRun
    where
        F: Fn() -> NaiveDateTime,
    {
        loop {
            if cancel.is_cancelled() {
                progress.report("Extraction cancelled");
                run.stop(StopReason::Cancelled);
                break;
            }

            let url = self
                .urls
                .roster_page(&run.collection_id, run.movement, run.page);
            progress.report(&format!(
                "Fetching {} page {} of {}",
                run.movement, run.page, run.collection_id
            ));
            tracing::debug!("Fetching roster page {}", url);

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) if e.is_not_found() => {
                    tracing::debug!("No page {} for {}", run.page, run.collection_id);
                    run.stop(StopReason::EndOfPages);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Stopping extraction of {}: {}", run.collection_id, e);
                    progress.report(&format!("Error: {}", e));
                    run.stop(StopReason::FetchFailed(e));
                    break;
                }
            };

            let page = match self.parser.parse_page(&html) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse page {} of {}: {}",
                        run.page,
                        run.collection_id,
                        e
                    );
                    progress.report(&format!("Parse failed on page {}: {}", run.page, e));
                    run.stop(StopReason::ParseFailed(e));
                    break;
                }
            };

            let had_records = page.had_records;
            let filtered = match run.window {
                Some(window) => window.filter(page.records, now()),
                None => page.records,
            };
            let accepted_on_page = filtered.len();
            run.accept(filtered);

            if accepted_on_page == 0 {
                if had_records {
                    tracing::debug!(
                        "Page {} of {} is past the recency window",
                        run.page,
                        run.collection_id
                    );
                }
                run.stop(StopReason::NoMatchingRecords { page: run.page });
                break;
            }

            tracing::debug!(
                "Page {} of {}: {} accepted ({} total)",
                run.page,
                run.collection_id,
                accepted_on_page,
                run.accepted.len()
            );
            run.advance_page();
            self.sleeper.sleep(self.polite_delay).await;
        }

        progress.report(&format!(
            "Found {} {} members in {}",
            run.accepted.len(),
            run.movement,
            run.collection_id
        ));
        tracing::info!(
            "Extracted {} {} records from {} ({:?})",
            run.accepted.len(),
            run.movement,
            run.collection_id,
            run.stop_reason
        );

        run
    }
}
