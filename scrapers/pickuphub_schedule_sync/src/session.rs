use reqwest::Url;
use scraper::{Html, Selector};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info};

use crate::{
    config::{ScrapingConfig, SiteConfig},
    error::SyncError,
    html::page_text,
};

/// Anything that can produce the text of the authenticated schedule page.
#[allow(async_fn_in_trait)]
pub trait ScheduleSource {
    async fn fetch_schedule_page(&self) -> Result<String, SyncError>;
}

/// A logged-in session on the scheduling site. The cookie jar lives inside
/// the client, so dropping the session ends it.
pub struct PickupHubSession {
    client: reqwest::Client,
    hub_url: String,
}

impl PickupHubSession {
    pub async fn login(site: &SiteConfig, scraping: &ScrapingConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(&scraping.user_agent)
            .timeout(Duration::from_secs(scraping.request_timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(SyncError::Http)?;

        info!("Logging in to PickupHub...");
        let login_page = client
            .get(&site.login_url)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest("login page", e))?;
        if !login_page.status().is_success() {
            return Err(SyncError::Authentication(format!(
                "login page returned HTTP {}",
                login_page.status()
            )));
        }
        let login_url = login_page.url().clone();
        let login_html = login_page
            .text()
            .await
            .map_err(|e| SyncError::from_reqwest("login page", e))?;

        let form = LoginForm::parse(&login_html, &login_url)?;
        let mut fields = form.hidden_fields;
        fields.push(("email".to_string(), site.username.clone()));
        fields.push(("password".to_string(), site.password.clone()));

        let response = client
            .post(form.action)
            .form(&fields)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest("login submit", e))?;

        if !response.status().is_success() {
            return Err(SyncError::Authentication(format!(
                "login returned HTTP {}",
                response.status()
            )));
        }
        if response.url().path().contains("login") {
            return Err(SyncError::Authentication("still on login page".to_string()));
        }

        info!("Login successful.");
        Ok(Self {
            client,
            hub_url: site.hub_url.clone(),
        })
    }
}

impl ScheduleSource for PickupHubSession {
    async fn fetch_schedule_page(&self) -> Result<String, SyncError> {
        let response = self
            .client
            .get(&self.hub_url)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest("schedule page", e))?;
        if !response.status().is_success() {
            return Err(SyncError::LayoutParse(format!(
                "schedule page returned HTTP {}",
                response.status()
            )));
        }
        let html = response
            .text()
            .await
            .map_err(|e| SyncError::from_reqwest("schedule page", e))?;
        debug!("Fetched schedule page ({} bytes)", html.len());
        Ok(page_text(&html))
    }
}

struct LoginForm {
    action: Url,
    hidden_fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Finds the form holding the password field and keeps its hidden inputs
    /// (CSRF tokens and the like).
    fn parse(html: &str, page_url: &Url) -> Result<Self, SyncError> {
        let document = Html::parse_document(html);
        let form_selector = Selector::parse("form").unwrap();
        let password_selector = Selector::parse("input[name='password']").unwrap();
        let hidden_selector = Selector::parse("input[type='hidden']").unwrap();

        let form = document
            .select(&form_selector)
            .find(|form| form.select(&password_selector).next().is_some())
            .ok_or_else(|| SyncError::Authentication("login form not found".to_string()))?;

        let action = match form.value().attr("action").filter(|a| !a.trim().is_empty()) {
            Some(action) => page_url
                .join(action)
                .map_err(|e| SyncError::Authentication(format!("bad login form action {:?}: {}", action, e)))?,
            None => page_url.clone(),
        };

        let hidden_fields = form
            .select(&hidden_selector)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        Ok(Self { action, hidden_fields })
    }
}

/// A schedule page saved to disk, for offline runs.
pub struct FileScheduleSource {
    path: PathBuf,
}

impl FileScheduleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScheduleSource for FileScheduleSource {
    async fn fetch_schedule_page(&self) -> Result<String, SyncError> {
        let html = tokio::fs::read_to_string(&self.path).await?;
        Ok(page_text(&html))
    }
}

/// An in-memory schedule page.
pub struct StaticScheduleSource {
    html: String,
}

impl StaticScheduleSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl ScheduleSource for StaticScheduleSource {
    async fn fetch_schedule_page(&self) -> Result<String, SyncError> {
        Ok(page_text(&self.html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_form_keeps_hidden_fields() {
        let html = r#"
            <form action="/search"><input name="q"></form>
            <form method="post" action="/session">
              <input type="hidden" name="_token" value="abc123">
              <input type="hidden" name="remember" value="">
              <input name="email"><input name="password" type="password">
            </form>
        "#;
        let page = Url::parse("https://pickuphub.net/login").unwrap();
        let form = LoginForm::parse(html, &page).unwrap();

        assert_eq!(form.action.as_str(), "https://pickuphub.net/session");
        assert_eq!(
            form.hidden_fields,
            vec![
                ("_token".to_string(), "abc123".to_string()),
                ("remember".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_login_form_without_action_posts_back_to_page() {
        let html = r#"<form><input name="email"><input name="password"></form>"#;
        let page = Url::parse("https://pickuphub.net/login").unwrap();
        let form = LoginForm::parse(html, &page).unwrap();
        assert_eq!(form.action, page);
        assert!(form.hidden_fields.is_empty());
    }

    #[test]
    fn test_missing_login_form_is_authentication_error() {
        let page = Url::parse("https://pickuphub.net/login").unwrap();
        assert!(matches!(
            LoginForm::parse("<p>Maintenance</p>", &page),
            Err(SyncError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_static_source_returns_page_text() {
        let source = StaticScheduleSource::new("<h1>My Schedule</h1><p>Recommended Games</p>");
        assert_eq!(
            source.fetch_schedule_page().await.unwrap(),
            "My ScheduleRecommended Games"
        );
    }
}
