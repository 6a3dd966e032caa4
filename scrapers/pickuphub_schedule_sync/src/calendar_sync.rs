use chrono::Duration;
use chrono_tz::Tz;
use tracing::info;

use crate::{
    calendar::{CalendarService, EventBody, EventDateTime},
    duplicate_guard::{is_new_event, localize},
    error::SyncError,
    types::{MatchRecord, MATCH_DURATION_MINUTES},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Inserted { id: String, html_link: Option<String> },
    AlreadyPresent,
}

/// Writes match records into one calendar, skipping ones already there.
pub struct CalendarSynchronizer<C: CalendarService> {
    calendar: C,
    calendar_id: String,
    time_zone: Tz,
}

impl<C: CalendarService> CalendarSynchronizer<C> {
    pub fn new(calendar: C, calendar_id: impl Into<String>, time_zone: Tz) -> Self {
        Self {
            calendar,
            calendar_id: calendar_id.into(),
            time_zone,
        }
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn build_event_body(&self, record: &MatchRecord) -> Result<EventBody, SyncError> {
        let zone = self.time_zone.name().to_string();
        let start = localize(record.start_time, self.time_zone)?;
        // Elapsed time, so a match spanning a DST change still lasts 80 minutes.
        let end = start + Duration::minutes(MATCH_DURATION_MINUTES);

        Ok(EventBody {
            summary: record.title.clone(),
            location: record.location.clone(),
            start: EventDateTime {
                date_time: start.to_rfc3339(),
                time_zone: zone.clone(),
            },
            end: EventDateTime {
                date_time: end.to_rfc3339(),
                time_zone: zone,
            },
        })
    }

    pub async fn sync(&self, record: &MatchRecord) -> Result<SyncOutcome, SyncError> {
        info!("Checking event: {} on {}", record.title, record.start_time);
        let body = self.build_event_body(record)?;

        if !is_new_event(&self.calendar, &self.calendar_id, record, self.time_zone).await? {
            return Ok(SyncOutcome::AlreadyPresent);
        }

        let created = self.calendar.insert_event(&self.calendar_id, &body).await?;
        info!(
            "Event created: {}",
            created.html_link.as_deref().unwrap_or(created.id.as_str())
        );
        Ok(SyncOutcome::Inserted {
            id: created.id,
            html_link: created.html_link,
        })
    }
}
