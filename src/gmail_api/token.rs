use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// Treat tokens this close to expiry as already expired.
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// OAuth2 user token as cached on disk. `expiry_date` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

/// Token endpoint response for both the code exchange and refresh grants.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl Token {
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            scope: response.scope,
            token_type: response.token_type,
            // An expires_in too large to represent is treated as no expiry.
            expiry_date: response
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .map(|expiry| expiry.timestamp_millis()),
        }
    }

    /// A token without an expiry is assumed valid; the API will say otherwise.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date {
            Some(expiry_ms) => {
                expiry_ms <= now.timestamp_millis().saturating_add(EXPIRY_MARGIN_MS)
            }
            None => false,
        }
    }

    /// Refresh responses usually omit the refresh token; keep the old one then.
    pub fn refreshed(self, response: TokenResponse, now: DateTime<Utc>) -> Self {
        let mut token = Token::from_response(response, now);
        if token.refresh_token.is_none() {
            token.refresh_token = self.refresh_token;
        }
        token
    }
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable token file both mean "no token".
    pub async fn load(&self) -> Option<Token> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read token file");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed token file");
                None
            }
        }
    }

    pub async fn save(&self, token: &Token) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!(path = %self.path.display(), "token persisted");
        Ok(())
    }

    /// Returns whether a token file was actually removed.
    pub async fn clear(&self) -> Result<bool, Error> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
