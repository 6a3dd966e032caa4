use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Summary given to every synced event, also used as the search keyword.
pub const MATCH_TITLE: &str = "Volleyball";
pub const MATCH_DURATION_MINUTES: i64 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub title: String,
    /// Wall-clock start as shown on the site, with no zone attached yet.
    pub start_time: NaiveDateTime,
    pub location: String,
}

impl MatchRecord {
    pub fn new(start_time: NaiveDateTime, location: impl Into<String>) -> Self {
        Self {
            title: MATCH_TITLE.to_string(),
            start_time,
            location: location.into(),
        }
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(MATCH_DURATION_MINUTES)
    }
}
