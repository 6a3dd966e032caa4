mod auth;
mod google;
mod model;

use chrono::{DateTime, FixedOffset};

use crate::error::SyncError;

pub use auth::{ServiceAccountKey, TokenSource, CALENDAR_SCOPE};
pub use google::GoogleCalendarClient;
pub use model::{CalendarEvent, CreatedEvent, EventBody, EventDateTime, EventStart, EventsPage};

/// The two calendar operations the sync needs. Tests substitute an
/// in-memory implementation.
#[allow(async_fn_in_trait)]
pub trait CalendarService {
    /// Single (recurrence-expanded) events starting at or after `time_min`
    /// whose text matches `query`.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<FixedOffset>,
        query: &str,
    ) -> Result<Vec<CalendarEvent>, SyncError>;

    async fn insert_event(&self, calendar_id: &str, body: &EventBody) -> Result<CreatedEvent, SyncError>;
}
