use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::{fs, path::Path};
use tracing::{error, info, warn};

use crate::{
    calendar::CalendarService,
    calendar_sync::{CalendarSynchronizer, SyncOutcome},
    duplicate_guard::localize,
    error::SyncError,
    record_parser::MatchRecordParser,
    schedule_extractor::extract_fragments,
    session::ScheduleSource,
    types::MatchRecord,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub found: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub parse_failures: usize,
    pub sync_failures: usize,
}

/// Fetches the schedule page and turns it into match records.
///
/// A page without the schedule section aborts; a single malformed entry is
/// logged and skipped. So is an entry whose start does not exist in
/// `time_zone` (a DST gap).
pub async fn scrape_matches<S: ScheduleSource>(
    source: &S,
    parser: &MatchRecordParser,
    time_zone: Tz,
    today: NaiveDate,
) -> Result<(Vec<MatchRecord>, usize), SyncError> {
    let text = source.fetch_schedule_page().await?;
    let fragments = extract_fragments(&text)?;

    let mut matches = Vec::with_capacity(fragments.len());
    let mut failures = 0;
    for fragment in &fragments {
        let parsed = parser.parse(fragment, today).and_then(|record| {
            localize(record.start_time, time_zone).map_err(|e| match e {
                SyncError::RecordParse { reason, .. } => SyncError::record_parse(fragment, reason),
                other => other,
            })?;
            Ok(record)
        });
        match parsed {
            Ok(record) => matches.push(record),
            Err(e) => {
                error!("Skipping schedule entry: {}", e);
                failures += 1;
            }
        }
    }

    Ok((matches, failures))
}

/// Best-effort plaintext dump of the parsed matches for manual inspection.
pub fn write_debug_dump(path: &Path, matches: &[MatchRecord]) {
    let result = serde_json::to_string_pretty(matches)
        .map_err(|e| e.to_string())
        .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
    if let Err(e) = result {
        warn!("Could not write debug dump to {}: {}", path.display(), e);
    }
}

pub async fn run_sync<S: ScheduleSource, C: CalendarService>(
    source: &S,
    parser: &MatchRecordParser,
    synchronizer: &CalendarSynchronizer<C>,
    dump_path: &Path,
    today: NaiveDate,
) -> Result<RunSummary, SyncError> {
    let (matches, parse_failures) = scrape_matches(source, parser, synchronizer.time_zone(), today).await?;
    write_debug_dump(dump_path, &matches);

    let mut summary = RunSummary {
        found: matches.len(),
        parse_failures,
        ..Default::default()
    };

    if matches.is_empty() {
        info!("No matches found.");
        return Ok(summary);
    }

    for record in &matches {
        match synchronizer.sync(record).await {
            Ok(SyncOutcome::Inserted { .. }) => summary.inserted += 1,
            Ok(SyncOutcome::AlreadyPresent) => summary.already_present += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(
                    "Failed to sync {} at {}{}: {}",
                    record.title,
                    record.start_time,
                    if e.is_transient() { " (transient)" } else { "" },
                    e
                );
                summary.sync_failures += 1;
            }
        }
    }

    info!(
        "All matches processed: {} found, {} inserted, {} already present, {} parse failures, {} sync failures",
        summary.found, summary.inserted, summary.already_present, summary.parse_failures, summary.sync_failures
    );
    Ok(summary)
}
