//! Client-credentials authentication against the token endpoint.

use crate::config::AppRegistration;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Token endpoint returned error status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Token endpoint returned an empty access token")]
    EmptyToken,
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Authenticated session used for every ingest request of a run.
///
/// Read-only once created; the run never refreshes it.
#[derive(Clone)]
pub struct Session {
    tenant: String,
    access_token: String,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(tenant: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Utc::now()).unwrap_or(false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tenant", &self.tenant)
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges application credentials for a [`Session`].
#[derive(Debug)]
pub struct Authenticator {
    token_url: String,
    client: reqwest::Client,
}

impl Authenticator {
    pub fn new(token_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            token_url: token_url.into(),
            client,
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub async fn authenticate(
        &self,
        tenant: &str,
        registration: &AppRegistration,
    ) -> Result<Session> {
        debug!(
            url = %self.token_url,
            client_id = %registration.client_id,
            "Requesting access token"
        );

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
            ("tenant", tenant),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let expires_at = token
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        info!(tenant = %tenant, expires_at = ?expires_at, "Authenticated");

        Ok(Session {
            tenant: tenant.to_string(),
            access_token: token.access_token,
            token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at,
        })
    }
}
