use serde::Deserialize;

/// Main configuration structure for Roster-Scout
///
/// Every section is optional; missing sections fall back to the defaults the
/// tool has always shipped with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP fetch and retry behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Retries after the first attempt before giving up
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Accept header sent with every request
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Roster extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Origin of the roster site
    #[serde(rename = "roster-origin", default = "default_roster_origin")]
    pub roster_origin: String,

    /// Origin of the killboard site
    #[serde(rename = "killboard-origin", default = "default_killboard_origin")]
    pub killboard_origin: String,

    /// Pause between successive roster pages (milliseconds)
    #[serde(rename = "polite-delay-ms", default = "default_polite_delay_ms")]
    pub polite_delay_ms: u64,

    /// Default recency window for departed members (days, 0 disables)
    #[serde(rename = "recency-days", default = "default_recency_days")]
    pub recency_days: u32,

    /// Maximum killboard lookups in flight at once
    #[serde(rename = "killboard-concurrency", default = "default_killboard_concurrency")]
    pub killboard_concurrency: usize,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory CSV files are written to and listed from
    #[serde(rename = "csv-dir", default = "default_csv_dir")]
    pub csv_dir: String,
}

/// In-game mail settings
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Origin of the game API
    #[serde(rename = "esi-origin", default = "default_esi_origin")]
    pub esi_origin: String,

    /// Pause after each sent message (milliseconds)
    #[serde(rename = "send-delay-ms", default = "default_send_delay_ms")]
    pub send_delay_ms: u64,

    /// Bearer token used when none is given on the command line
    #[serde(default)]
    pub token: Option<String>,
}

/// Web server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    600
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X) AppleWebKit/537.36 (KHTML, like Gecko) Chrome Safari"
        .to_string()
}

fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_roster_origin() -> String {
    "https://evewho.com".to_string()
}

fn default_killboard_origin() -> String {
    "https://zkillboard.com".to_string()
}

fn default_polite_delay_ms() -> u64 {
    700
}

fn default_recency_days() -> u32 {
    7
}

fn default_killboard_concurrency() -> usize {
    4
}

fn default_csv_dir() -> String {
    "./csv".to_string()
}

fn default_esi_origin() -> String {
    "https://esi.evetech.net".to_string()
}

fn default_send_delay_ms() -> u64 {
    1000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            base_delay_ms: default_base_delay_ms(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            roster_origin: default_roster_origin(),
            killboard_origin: default_killboard_origin(),
            polite_delay_ms: default_polite_delay_ms(),
            recency_days: default_recency_days(),
            killboard_concurrency: default_killboard_concurrency(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            esi_origin: default_esi_origin(),
            send_delay_ms: default_send_delay_ms(),
            token: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
