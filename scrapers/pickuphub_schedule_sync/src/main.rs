use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::{path::PathBuf, time::Duration};
use tracing::info;

use pickuphub_schedule_sync::{
    calendar::{GoogleCalendarClient, ServiceAccountKey, TokenSource},
    calendar_sync::CalendarSynchronizer,
    config::SyncConfig,
    pipeline::{run_sync, scrape_matches, RunSummary},
    record_parser::MatchRecordParser,
    session::{FileScheduleSource, PickupHubSession},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in, scrape "My Schedule" and add new matches to the calendar
    Sync {
        /// Use a saved schedule page instead of logging in
        #[arg(short, long)]
        page_file: Option<PathBuf>,
    },
    /// Parse a saved schedule page and print the matches without syncing
    Parse {
        /// Path to the saved HTML page
        #[arg(short, long)]
        file: PathBuf,
    },
}

async fn sync(config: &SyncConfig, page_file: Option<PathBuf>) -> Result<RunSummary> {
    match &page_file {
        Some(_) => config.validate_calendar()?,
        None => config.validate()?,
    }
    let tz = config.time_zone()?;

    let tokens = match &config.calendar.access_token {
        Some(token) => TokenSource::Static(token.clone()),
        None => TokenSource::service_account(ServiceAccountKey::from_file(&config.calendar.credentials_path)?),
    };
    let client = GoogleCalendarClient::new(
        &config.calendar.api_base_url,
        tokens,
        Duration::from_secs(config.scraping.request_timeout_secs),
    )?;
    let synchronizer = CalendarSynchronizer::new(client, config.calendar.calendar_id.clone(), tz);
    let parser = MatchRecordParser::new(config.scraping.year_inference);
    let today = Utc::now().with_timezone(&tz).date_naive();
    let dump_path = &config.output.debug_dump_path;

    let summary = match page_file {
        Some(path) => {
            let source = FileScheduleSource::new(path);
            run_sync(&source, &parser, &synchronizer, dump_path, today).await?
        }
        None => {
            let session = PickupHubSession::login(&config.site, &config.scraping).await?;
            run_sync(&session, &parser, &synchronizer, dump_path, today).await?
        }
    };

    Ok(summary)
}

async fn parse(config: &SyncConfig, file: PathBuf) -> Result<()> {
    let tz = config.time_zone()?;
    let parser = MatchRecordParser::new(config.scraping.year_inference);
    let today = Utc::now().with_timezone(&tz).date_naive();
    let source = FileScheduleSource::new(&file);

    let (matches, failures) = scrape_matches(&source, &parser, tz, today)
        .await
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    for record in &matches {
        println!(
            "{}\t{}\t{}\t{}",
            record.title,
            record.start_time.format("%Y-%m-%d %H:%M"),
            record.end_time().format("%H:%M"),
            record.location
        );
    }
    info!("{} matches parsed, {} entries skipped", matches.len(), failures);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync { page_file: None }) {
        Commands::Sync { page_file } => {
            info!("{}", "-".repeat(30));
            info!("Starting schedule sync...");
            let summary = sync(&config, page_file).await?;
            info!(
                "Done: {} inserted, {} already present, {} failed",
                summary.inserted,
                summary.already_present,
                summary.parse_failures + summary.sync_failures
            );
            info!("{}", "-".repeat(30));
        }
        Commands::Parse { file } => parse(&config, file).await?,
    }

    Ok(())
}
