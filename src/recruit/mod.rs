//! Recruitment module
//!
//! Turns roster extraction across many corporations into a list of
//! candidates with kill statistics, filtered by thresholds.

mod filter;
mod killboard;
mod pipeline;

pub use filter::Thresholds;
pub use killboard::{extract_kill_stats, KillStats, KillboardClient};
pub use pipeline::{MemberRow, RecruitOutcome, RecruitPipeline, RecruitRequest, DEFAULT_FILE_PREFIX};
