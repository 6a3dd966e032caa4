use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

use crate::{
    calendar::ServiceAccountKey,
    error::SyncError,
    record_parser::YearInference,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    pub login_url: String,
    pub hub_url: String,
    pub username: String,
    pub password: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: "https://pickuphub.net/login".to_string(),
            hub_url: "https://pickuphub.net/hub".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub credentials_path: PathBuf,
    pub access_token: Option<String>,
    pub time_zone: String,
    pub api_base_url: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: String::new(),
            credentials_path: PathBuf::from("service_account.json"),
            access_token: None,
            time_zone: "America/Toronto".to_string(),
            api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub year_inference: YearInference,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; PickupHubScheduleSync/0.1)".to_string(),
            request_timeout_secs: 30,
            year_inference: YearInference::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub debug_dump_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            debug_dump_path: PathBuf::from("Output.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    pub site: SiteConfig,
    pub calendar: CalendarConfig,
    pub scraping: ScrapingConfig,
    pub output: OutputConfig,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(login_url) = env::var("PICKUPHUB_LOGIN_URL") {
            config.site.login_url = login_url;
        }
        if let Ok(hub_url) = env::var("PICKUPHUB_HUB_URL") {
            config.site.hub_url = hub_url;
        }
        if let Ok(username) = env::var("PICKUPHUB_USERNAME") {
            config.site.username = username;
        }
        if let Ok(password) = env::var("PICKUPHUB_PASSWORD") {
            config.site.password = password;
        }

        // The personal calendar id is usually the same address used to log in.
        config.calendar.calendar_id =
            env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| config.site.username.clone());
        if let Ok(path) = env::var("GOOGLE_CALENDAR_CREDENTIALS") {
            config.calendar.credentials_path = PathBuf::from(path);
        }
        if let Ok(token) = env::var("GOOGLE_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                config.calendar.access_token = Some(token);
            }
        }
        if let Ok(tz) = env::var("CALENDAR_TIME_ZONE") {
            config.calendar.time_zone = tz;
        }
        if let Ok(base) = env::var("GOOGLE_CALENDAR_API_BASE") {
            config.calendar.api_base_url = base;
        }

        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Ok(timeout) = env::var("SCRAPER_TIMEOUT_SECS").map_or(Ok(None), |t| t.parse::<u64>().map(Some)) {
            if let Some(timeout) = timeout {
                config.scraping.request_timeout_secs = timeout;
            }
        }
        if let Ok(strategy) = env::var("YEAR_INFERENCE") {
            match strategy.trim().to_ascii_lowercase().as_str() {
                "current" => config.scraping.year_inference = YearInference::CurrentYear,
                "nearest" => config.scraping.year_inference = YearInference::default(),
                other => tracing::warn!("Ignoring unknown YEAR_INFERENCE value: {}", other),
            }
        }

        if let Ok(path) = env::var("DEBUG_DUMP_PATH") {
            config.output.debug_dump_path = PathBuf::from(path);
        }

        config
    }

    /// Resolves the configured IANA zone name.
    pub fn time_zone(&self) -> Result<Tz, SyncError> {
        self.calendar
            .time_zone
            .parse::<Tz>()
            .map_err(|_| SyncError::Config(format!("unknown time zone: {}", self.calendar.time_zone)))
    }

    /// Checks everything the pipeline needs before any network call is made.
    ///
    /// The credentials file must parse as a service-account key unless a
    /// static access token was supplied.
    pub fn validate(&self) -> Result<(), SyncError> {
        self.validate_site()?;
        self.validate_calendar()
    }

    pub fn validate_site(&self) -> Result<(), SyncError> {
        if self.site.username.trim().is_empty() || self.site.password.is_empty() {
            return Err(SyncError::Config(
                "PICKUPHUB_USERNAME and PICKUPHUB_PASSWORD must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_calendar(&self) -> Result<(), SyncError> {
        if self.calendar.calendar_id.trim().is_empty() {
            return Err(SyncError::Config("calendar id is empty".to_string()));
        }
        self.time_zone()?;
        if self.calendar.access_token.is_none() {
            ServiceAccountKey::from_file(&self.calendar.credentials_path)?;
        }
        Ok(())
    }
}
