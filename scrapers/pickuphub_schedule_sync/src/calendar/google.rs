use chrono::{DateTime, FixedOffset};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{
    auth::TokenSource,
    model::{ApiErrorBody, CalendarEvent, CreatedEvent, EventBody, EventsPage},
    CalendarService,
};
use crate::error::SyncError;

/// Calendar v3 REST client authenticated with a service account.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    tokens: TokenSource,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: &str, tokens: TokenSource, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyncError::Http)?;

        Ok(Self {
            http,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T, SyncError> {
        let token = self.tokens.access_token(&self.http).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(what, e))?;

        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::from_reqwest(what, e))
    }
}

async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<ApiErrorBody>(&message)
        .ok()
        .and_then(|body| body.first_reason().map(str::to_string));
    Err(SyncError::CalendarService {
        status: Some(status.as_u16()),
        reason,
        message,
    })
}

impl CalendarService for GoogleCalendarClient {
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<FixedOffset>,
        query: &str,
    ) -> Result<Vec<CalendarEvent>, SyncError> {
        let url = self.events_url(calendar_id);
        let time_min = time_min.to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("timeMin", time_min.clone()),
                ("q", query.to_string()),
                ("singleEvents", "true".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: EventsPage = self
                .send_json(self.http.get(&url).query(&params), "calendar list")
                .await?;
            debug!("Listed {} events from {}", page.items.len(), calendar_id);
            events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }

    async fn insert_event(&self, calendar_id: &str, body: &EventBody) -> Result<CreatedEvent, SyncError> {
        let url = self.events_url(calendar_id);
        self.send_json(self.http.post(&url).json(body), "calendar insert")
            .await
    }
}
