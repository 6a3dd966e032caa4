use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{error::SyncError, types::MatchRecord};

pub const DURATION_MARKER: &str = "(80 mins)";
const DATE_FORMAT: &str = "%Y %b %d %I:%M %p";

/// How the missing year of a schedule entry is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearInference {
    /// Always the year of `today`. Mis-dates January games seen in December.
    CurrentYear,
    /// The earliest of this year and next year that is no more than
    /// `tolerance_days` before `today`. Last year is never tried, so a late
    /// December game still listed in early January lands on next December.
    Nearest { tolerance_days: i64 },
}

impl Default for YearInference {
    fn default() -> Self {
        Self::Nearest { tolerance_days: 7 }
    }
}

pub struct MatchRecordParser {
    year_inference: YearInference,
}

impl MatchRecordParser {
    pub fn new(year_inference: YearInference) -> Self {
        Self { year_inference }
    }

    /// Parses one fragment such as
    /// `Wednesday, Jan 15 @7:00 p.m.(80 mins)Community Centre A`.
    pub fn parse(&self, fragment: &str, today: NaiveDate) -> Result<MatchRecord, SyncError> {
        // Anything before the last comma is a weekday label.
        let last = fragment.rsplit(',').next().unwrap_or(fragment);

        let (when, location) = last
            .split_once(DURATION_MARKER)
            .ok_or_else(|| SyncError::record_parse(fragment, format!("missing {:?} marker", DURATION_MARKER)))?;

        let location = location.trim();
        if location.is_empty() {
            return Err(SyncError::record_parse(fragment, "empty location"));
        }

        let when = normalize_date_time(when);
        let start_time = self.resolve_start(&when, today).ok_or_else(|| {
            SyncError::record_parse(fragment, format!("invalid date/time {:?}", when))
        })?;

        Ok(MatchRecord::new(start_time, location))
    }

    fn resolve_start(&self, when: &str, today: NaiveDate) -> Option<NaiveDateTime> {
        let current = today.year();
        match self.year_inference {
            YearInference::CurrentYear => parse_with_year(current, when),
            YearInference::Nearest { tolerance_days } => {
                let earliest = today - Duration::days(tolerance_days);
                let candidates: Vec<NaiveDateTime> = [current, current + 1]
                    .into_iter()
                    .filter_map(|year| parse_with_year(year, when))
                    .collect();

                candidates
                    .iter()
                    .find(|candidate| candidate.date() >= earliest)
                    .or_else(|| candidates.first())
                    .copied()
            }
        }
    }
}

/// `" Jan 15 @7:00 p.m. "` becomes `"Jan 15 7:00 pm"`.
fn normalize_date_time(raw: &str) -> String {
    raw.replace('.', "")
        .replace('@', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_with_year(year: i32, when: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{} {}", year, when), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_parse_community_centre_fragment() {
        let parser = MatchRecordParser::new(YearInference::CurrentYear);
        let record = parser
            .parse(", Jan 15 @7:00 pm.(80 mins)Community Centre A ", date(2025, 1, 10))
            .unwrap();

        assert_eq!(record.title, "Volleyball");
        assert_eq!(record.start_time, at(2025, 1, 15, 19, 0));
        assert_eq!(record.location, "Community Centre A");
        assert_eq!(record.end_time(), at(2025, 1, 15, 20, 20));
    }

    #[test]
    fn test_parse_discards_weekday_and_abbreviation_dots() {
        let parser = MatchRecordParser::new(YearInference::default());
        let record = parser
            .parse("Saturday, Mar 8 @10:30 a.m.(80 mins)  Eastside Gym", date(2025, 3, 1))
            .unwrap();

        assert_eq!(record.location, "Eastside Gym");
        assert_eq!(record.start_time, at(2025, 3, 8, 10, 30));
    }

    #[test]
    fn test_comma_in_venue_is_rejected() {
        // Only the text after the last comma is considered.
        let parser = MatchRecordParser::new(YearInference::default());
        let err = parser
            .parse("Saturday, Mar 8 @10:30 a.m.(80 mins)Eastside Gym, Court 2", date(2025, 3, 1))
            .unwrap_err();
        assert!(matches!(err, SyncError::RecordParse { .. }));
    }

    #[test]
    fn test_parse_accepts_space_after_at_sign() {
        let parser = MatchRecordParser::new(YearInference::CurrentYear);
        let record = parser
            .parse("Friday, Feb 07 @ 09:15 PM(80 mins)North Hall", date(2025, 2, 1))
            .unwrap();
        assert_eq!(record.start_time, at(2025, 2, 7, 21, 15));
    }

    #[test]
    fn test_current_year_strategy_ignores_wraparound() {
        let parser = MatchRecordParser::new(YearInference::CurrentYear);
        let record = parser
            .parse("Friday, Jan 3 @7:00 p.m.(80 mins)Gym", date(2025, 12, 20))
            .unwrap();
        assert_eq!(record.start_time, at(2025, 1, 3, 19, 0));
    }

    #[test]
    fn test_nearest_strategy_rolls_into_next_year() {
        let parser = MatchRecordParser::new(YearInference::default());
        let january = parser
            .parse("Friday, Jan 3 @7:00 p.m.(80 mins)Gym", date(2025, 12, 20))
            .unwrap();
        assert_eq!(january.start_time, at(2026, 1, 3, 19, 0));

        let december = parser
            .parse("Sunday, Dec 21 @7:00 p.m.(80 mins)Gym", date(2025, 12, 20))
            .unwrap();
        assert_eq!(december.start_time, at(2025, 12, 21, 19, 0));
    }

    #[test]
    fn test_nearest_strategy_keeps_recent_past_games() {
        let parser = MatchRecordParser::new(YearInference::Nearest { tolerance_days: 7 });
        let record = parser
            .parse("Monday, Jun 2 @6:00 p.m.(80 mins)Gym", date(2025, 6, 5))
            .unwrap();
        assert_eq!(record.start_time, at(2025, 6, 2, 18, 0));
    }

    #[test]
    fn test_nearest_strategy_never_looks_back_a_year() {
        let parser = MatchRecordParser::new(YearInference::default());
        let record = parser
            .parse("Tuesday, Dec 30 @7:00 p.m.(80 mins)Gym", date(2026, 1, 3))
            .unwrap();
        assert_eq!(record.start_time, at(2026, 12, 30, 19, 0));
    }

    #[test]
    fn test_missing_duration_marker() {
        let parser = MatchRecordParser::new(YearInference::CurrentYear);
        let err = parser
            .parse("Wednesday, Jan 15 @7:00 p.m. Community Centre A", date(2025, 1, 1))
            .unwrap_err();
        assert!(matches!(err, SyncError::RecordParse { .. }));
    }

    #[test]
    fn test_empty_location() {
        let parser = MatchRecordParser::new(YearInference::CurrentYear);
        let err = parser
            .parse("Wednesday, Jan 15 @7:00 p.m.(80 mins)   ", date(2025, 1, 1))
            .unwrap_err();
        match err {
            SyncError::RecordParse { reason, .. } => assert_eq!(reason, "empty location"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_date_names_fragment() {
        let parser = MatchRecordParser::new(YearInference::default());
        let fragment = "Wednesday, Jam 45 @7:00 p.m.(80 mins)Gym";
        match parser.parse(fragment, date(2025, 1, 1)).unwrap_err() {
            SyncError::RecordParse { fragment: f, .. } => assert_eq!(f, fragment),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parsed_fields_survive_reformatting() {
        let parser = MatchRecordParser::new(YearInference::CurrentYear);
        let today = date(2025, 1, 1);
        for fragment in [
            "Wednesday, Jan 15 @7:00 p.m.(80 mins)Community Centre A",
            "Thursday, Oct 2 @12:05 a.m.(80 mins)Riverside Arena",
            "Sunday, Aug 31 @12:45 p.m.(80 mins)West End Y",
        ] {
            let record = parser.parse(fragment, today).unwrap();
            let rebuilt = format!(
                "{}, {} @{}(80 mins){}",
                record.start_time.format("%A"),
                record.start_time.format("%b %d"),
                record.start_time.format("%-I:%M %P"),
                record.location
            );
            assert_eq!(parser.parse(&rebuilt, today).unwrap(), record);
        }
    }
}
