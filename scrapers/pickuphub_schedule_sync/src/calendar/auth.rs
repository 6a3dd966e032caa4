//! Service-account authentication for the Calendar API.
//!
//! A signed JWT is exchanged for a short-lived bearer token at the key's
//! `token_uri` (OAuth2 JWT-bearer grant).

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::SyncError;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
// Refresh a little early so a token never expires mid-request.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("cannot read credentials file {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
            .map_err(|e| SyncError::Config(format!("invalid credentials file {}: {}", path.display(), e)))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

pub struct CachedToken {
    value: String,
    expires_at: i64,
}

pub enum TokenSource {
    /// A bearer token minted elsewhere, used as-is.
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self::ServiceAccount {
            key,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, SyncError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount { key, cached } => {
                let mut cached = cached.lock().await;
                let now = Utc::now().timestamp();
                if let Some(token) = cached.as_ref() {
                    if token.expires_at - EXPIRY_MARGIN_SECS > now {
                        return Ok(token.value.clone());
                    }
                }

                let token = exchange_jwt(http, key, now).await?;
                let value = token.value.clone();
                *cached = Some(token);
                Ok(value)
            }
        }
    }
}

fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, SyncError> {
    let claims = Claims {
        iss: &key.client_email,
        scope: CALENDAR_SCOPE,
        aud: &key.token_uri,
        exp: now + TOKEN_LIFETIME_SECS,
        iat: now,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SyncError::CalendarCredentials(format!("unusable private key: {}", e)))?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| SyncError::CalendarCredentials(format!("failed to sign JWT: {}", e)))
}

async fn exchange_jwt(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    now: i64,
) -> Result<CachedToken, SyncError> {
    info!("Requesting calendar access token for {}", key.client_email);
    let assertion = sign_assertion(key, now)?;

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| SyncError::from_reqwest("token request", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status.as_u16() {
            400 | 401 | 403 => SyncError::CalendarCredentials(format!("token endpoint returned {}: {}", status, body)),
            code => SyncError::calendar_service(Some(code), body),
        });
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| SyncError::from_reqwest("token response", e))?;
    debug!("Access token acquired");

    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS),
    })
}
