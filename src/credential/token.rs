use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;

use super::CredentialError;

/// A bearer token for the ARM audience.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Entra returns numbers, IMDS returns the same fields as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(i64),
    Text(String),
}

impl Seconds {
    fn get(&self) -> Option<i64> {
        match self {
            Seconds::Number(n) => Some(*n),
            Seconds::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Seconds>,
    #[serde(default)]
    expires_on: Option<Seconds>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl TokenResponse {
    fn into_token(self) -> AccessToken {
        let expires_on = self
            .expires_on
            .and_then(|s| s.get())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| {
                self.expires_in
                    .and_then(|s| s.get())
                    .and_then(Duration::try_seconds)
                    .and_then(|d| Utc::now().checked_add_signed(d))
            });
        AccessToken {
            token: self.access_token,
            expires_on,
        }
    }
}

/// Decode an OAuth token endpoint response (Entra or IMDS).
pub(super) async fn from_response(
    credential: &'static str,
    response: reqwest::Response,
) -> Result<AccessToken, CredentialError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CredentialError::from_source(credential, e))?;

    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) if !err.error.is_empty() => {
                format!("{} {}: {}", status, err.error, err.error_description)
            }
            _ => format!("{}: {}", status, body),
        };
        return Err(CredentialError::from_source(credential, message));
    }

    parse_token(&body).map_err(|e| CredentialError::from_source(credential, e))
}

pub(super) fn parse_token(body: &str) -> Result<AccessToken, serde_json::Error> {
    serde_json::from_str::<TokenResponse>(body).map(TokenResponse::into_token)
}
