use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::{
    calendar::{CalendarEvent, CalendarService},
    error::SyncError,
    types::MatchRecord,
};

/// Attaches `tz` to a wall-clock time. Times inside a DST gap do not exist
/// and are rejected; times in a DST fold resolve to the earlier instant.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, SyncError> {
    tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        SyncError::record_parse(
            &naive.to_string(),
            format!("local time does not exist in {}", tz.name()),
        )
    })
}

/// Returns `true` when no event with the same title and start instant is
/// already on the calendar, i.e. the record is safe to insert.
pub async fn is_new_event<C: CalendarService>(
    calendar: &C,
    calendar_id: &str,
    record: &MatchRecord,
    tz: Tz,
) -> Result<bool, SyncError> {
    let start = localize(record.start_time, tz)?.fixed_offset();
    let events = calendar.list_events(calendar_id, start, &record.title).await?;
    debug!("{} candidate events at or after {}", events.len(), start.to_rfc3339());

    if let Some(existing) = events.iter().find(|event| is_same_match(event, &record.title, &start)) {
        info!(
            "Event already exists: {} at {}",
            existing.summary.as_deref().unwrap_or_default(),
            existing.start.date_time.as_deref().unwrap_or_default()
        );
        return Ok(false);
    }

    info!("Event doesn't exist yet: {} at {}", record.title, start.to_rfc3339());
    Ok(true)
}

fn is_same_match(event: &CalendarEvent, title: &str, start: &DateTime<FixedOffset>) -> bool {
    let title_matches = event
        .summary
        .as_deref()
        .is_some_and(|summary| summary.contains(title));
    if !title_matches {
        return false;
    }

    match event.start.date_time.as_deref() {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(existing) => existing == *start,
            Err(_) => raw == start.to_rfc3339(),
        },
        None => false,
    }
}
