//! Roster-Scout main entry point
//!
//! This is the command-line interface for the Roster-Scout extractor and mailer.

use clap::{Args, Parser, Subcommand};
use roster_scout::config::{load_or_default, Config};
use roster_scout::fetch::build_http_client;
use roster_scout::mail::{parse_variable, MailSender, MailTemplate, StaticCredentials};
use roster_scout::output::{make_csv_file_name, read_csv_file, save_members_csv, ConsoleProgress};
use roster_scout::recruit::{RecruitPipeline, RecruitRequest, Thresholds};
use roster_scout::server::{self, AppState};
use roster_scout::{MovementType, PageFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Roster-Scout: a polite roster scraper and recruitment mailer
///
/// Roster-Scout pages through public corporation rosters, keeps members who
/// recently left (or joined, or are current), enriches them with killboard
/// statistics and writes them to CSV. The CSV can then be used to mail every
/// listed character.
#[derive(Parser, Debug)]
#[command(name = "roster-scout")]
#[command(version)]
#[command(about = "A polite roster scraper and recruitment mailer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract members of an alliance or a list of corporations to CSV
    Extract(ExtractArgs),

    /// Mail every character listed in a CSV file
    Mail(MailArgs),

    /// Run the HTTP API for the web UI
    Serve {
        /// Port to listen on (overrides the config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Alliance whose corporations are extracted
    #[arg(long, required_unless_present = "corp_ids")]
    alliance_id: Option<String>,

    /// Comma-separated corporation ids
    #[arg(long, value_delimiter = ',')]
    corp_ids: Vec<String>,

    /// Roster listing to page through: departed, current or joined
    #[arg(long = "type", default_value = "departed")]
    movement: MovementType,

    /// Only keep departures within this many days (0 keeps all)
    #[arg(long)]
    days: Option<u32>,

    #[arg(long)]
    file_name_prefix: Option<String>,

    /// Alliance name used for labels and the file name
    #[arg(long)]
    alliance_name: Option<String>,

    /// Ships a member must have destroyed (0 disables)
    #[arg(long)]
    min_destroyed_ships: Option<u64>,

    /// Efficiency percentage a member must exceed (0 disables)
    #[arg(long)]
    min_efficiency: Option<f64>,
}

#[derive(Args, Debug)]
struct MailArgs {
    /// CSV file with an `Id` column
    #[arg(long, value_name = "PATH")]
    csv: PathBuf,

    /// TOML file with `subject` and `body`
    #[arg(long, value_name = "PATH")]
    template: PathBuf,

    /// Extra template variable, KEY=VALUE (repeatable)
    #[arg(long = "var", value_parser = parse_variable)]
    vars: Vec<(String, String)>,

    /// Bearer token (overrides the config and ESI_TOKEN)
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => {
            if let Some(path) = &cli.config {
                tracing::info!("Configuration loaded from: {}", path.display());
            }
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Extract(args) => handle_extract(config, args, progress_bar(cli.quiet)).await,
        Command::Mail(args) => handle_mail(config, args, progress_bar(cli.quiet)).await,
        Command::Serve { port } => handle_serve(config, port).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("roster_scout=info,warn"),
            1 => EnvFilter::new("roster_scout=debug,info"),
            2 => EnvFilter::new("roster_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn progress_bar(quiet: bool) -> ConsoleProgress {
    if quiet {
        ConsoleProgress::hidden()
    } else {
        ConsoleProgress::new()
    }
}

/// Cancels the token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current step...");
            handle.cancel();
        }
    });
    token
}

async fn handle_extract(
    config: Config,
    args: ExtractArgs,
    progress: ConsoleProgress,
) -> anyhow::Result<()> {
    let fetcher = PageFetcher::new(&config.fetcher)?;
    let pipeline = RecruitPipeline::from_config(fetcher, &config.extractor);

    let request = RecruitRequest {
        alliance_id: args.alliance_id,
        corp_ids: args.corp_ids,
        movement: args.movement,
        days: Some(args.days.unwrap_or(config.extractor.recency_days)),
        file_name_prefix: args.file_name_prefix,
        alliance_name: args.alliance_name,
        thresholds: Thresholds::new(args.min_destroyed_ships, args.min_efficiency),
    };

    let cancel = cancel_on_ctrl_c();
    let outcome = match pipeline.run(&request, &progress, &cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.finish(&format!("Error: {}", e));
            tracing::error!("Extraction failed: {}", e);
            return Err(e.into());
        }
    };
    progress.finish(&format!(
        "Processed {}/{} corporations",
        outcome.corporations_done, outcome.corporations_total
    ));

    let file_name = make_csv_file_name(&outcome.prefix, outcome.movement);
    match save_members_csv(&PathBuf::from(&config.output.csv_dir), &file_name, &outcome.rows)? {
        Some(path) => println!("✓ Saved {} members to {}", outcome.rows.len(), path.display()),
        None => println!("No members matched; nothing written"),
    }

    if outcome.cancelled {
        tracing::warn!("Extraction was interrupted; the file holds partial results");
    }
    Ok(())
}

async fn handle_mail(
    config: Config,
    args: MailArgs,
    progress: ConsoleProgress,
) -> anyhow::Result<()> {
    let table = read_csv_file(&args.csv)?;
    if table.is_empty() {
        anyhow::bail!("{} has no rows to mail", args.csv.display());
    }

    let template = MailTemplate::load(&args.template)?.with_variables(args.vars);

    let token = args
        .token
        .or_else(|| config.mail.token.clone())
        .ok_or_else(|| anyhow::anyhow!("No token given; use --token or set ESI_TOKEN"))?;
    let credentials = StaticCredentials::new(token)?;

    let client = build_http_client(&config.fetcher)?;
    let sender = MailSender::new(client, &config.mail, Arc::new(credentials));

    tracing::info!("Mailing {} characters from {}", table.len(), args.csv.display());
    let cancel = cancel_on_ctrl_c();
    let report = sender.send_all(&template, &table.data, &progress, &cancel).await;
    progress.finish(&format!("Sent {}/{} messages", report.sent, report.total));

    if let Some(e) = report.error {
        tracing::error!("Mail run stopped: {}", e);
        return Err(e.into());
    }
    if report.cancelled {
        println!("Paused after {} of {} messages", report.sent, report.total);
    } else {
        println!("✓ Sent {} messages", report.sent);
    }
    Ok(())
}

async fn handle_serve(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let host = config.server.host.clone();
    let port = config.server.port;

    let state = AppState::new(config)?;
    server::serve(&host, port, state).await
}
