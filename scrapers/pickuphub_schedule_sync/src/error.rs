use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("login to the scheduling site failed: {0}")]
    Authentication(String),

    #[error("unexpected schedule page layout: {0}")]
    LayoutParse(String),

    #[error("could not parse match fragment {fragment:?}: {reason}")]
    RecordParse { fragment: String, reason: String },

    #[error("calendar credentials rejected: {0}")]
    CalendarCredentials(String),

    #[error("calendar service error (status {status:?}): {message}")]
    CalendarService {
        status: Option<u16>,
        /// First `error.errors[].reason` from the API error body, if any.
        reason: Option<String>,
        message: String,
    },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 403 reasons Google uses for usage limits rather than missing permission.
const QUOTA_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
];

impl SyncError {
    pub fn calendar_service(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::CalendarService {
            status,
            reason: None,
            message: message.into(),
        }
    }

    pub fn record_parse(fragment: &str, reason: impl Into<String>) -> Self {
        Self::RecordParse {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    /// Classifies a transport error, keeping timeouts apart from other failures.
    pub fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{}: {}", context, err))
        } else {
            Self::Http(err)
        }
    }

    /// Fatal errors abort the whole run; everything else only skips one match.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Authentication(_)
            | Self::LayoutParse(_)
            | Self::CalendarCredentials(_) => true,
            Self::CalendarService { status: Some(401), .. } => true,
            Self::CalendarService { status: Some(403), .. } => !self.is_quota_limited(),
            _ => false,
        }
    }

    /// A usage-limit rejection: only this request failed, the credentials are fine.
    pub fn is_quota_limited(&self) -> bool {
        match self {
            Self::CalendarService {
                status: Some(403 | 429),
                reason: Some(reason),
                ..
            } => QUOTA_REASONS.contains(&reason.as_str()),
            _ => false,
        }
    }

    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::CalendarService { status: Some(status), .. } => {
                *status == 429 || *status >= 500 || self.is_quota_limited()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SyncError::Authentication("still on login page".into()).is_fatal());
        assert!(SyncError::LayoutParse("no marker".into()).is_fatal());
        assert!(SyncError::calendar_service(Some(403), "forbidden").is_fatal());
        assert!(SyncError::calendar_service(Some(401), "invalid credentials").is_fatal());
        assert!(!SyncError::record_parse("Jan 99", "bad day").is_fatal());
        assert!(!SyncError::calendar_service(Some(500), "oops").is_fatal());
    }

    #[test]
    fn test_transient_classification() {
        assert!(SyncError::Timeout("calendar list".into()).is_transient());
        assert!(SyncError::calendar_service(Some(503), "").is_transient());
        assert!(SyncError::calendar_service(Some(429), "").is_transient());
        assert!(!SyncError::calendar_service(Some(400), "").is_transient());
        assert!(!SyncError::LayoutParse("x".into()).is_transient());
    }

    #[test]
    fn test_quota_forbidden_only_skips_one_match() {
        let quota = SyncError::CalendarService {
            status: Some(403),
            reason: Some("rateLimitExceeded".to_string()),
            message: "Rate Limit Exceeded".to_string(),
        };
        assert!(quota.is_quota_limited());
        assert!(!quota.is_fatal());
        assert!(quota.is_transient());

        let denied = SyncError::CalendarService {
            status: Some(403),
            reason: Some("forbidden".to_string()),
            message: "Requires writer access".to_string(),
        };
        assert!(!denied.is_quota_limited());
        assert!(denied.is_fatal());
        assert!(!denied.is_transient());
    }

    #[test]
    fn test_record_parse_message_names_fragment() {
        let err = SyncError::record_parse("Jan 15 @7:00 pm", "missing duration marker");
        assert_eq!(
            err.to_string(),
            "could not parse match fragment \"Jan 15 @7:00 pm\": missing duration marker"
        );
    }
}
