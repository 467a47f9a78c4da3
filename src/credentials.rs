//! Loading of the Google Cloud credential file.
//!
//! The file is either an OAuth2 client (`installed` or `web` section) or a
//! service account key (`"type": "service_account"`). Both are surfaced as
//! variants of [`Credentials`] so the authenticator can match exhaustively.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthSection {
    Installed,
    Web,
}

impl fmt::Display for OAuthSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthSection::Installed => f.write_str("installed"),
            OAuthSection::Web => f.write_str("web"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OAuthClient {
    pub section: OAuthSection,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
    pub auth_uri: String,
    pub token_uri: String,
}

impl OAuthClient {
    /// The first registered redirect URI, which is the one the consent flow uses.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uris
            .iter()
            .map(String::as_str)
            .find(|uri| !uri.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    OAuth(OAuthClient),
    ServiceAccount(ServiceAccountCredentials),
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    token_uri: Option<String>,
    installed: Option<OAuthSectionFile>,
    web: Option<OAuthSectionFile>,
}

#[derive(Deserialize)]
struct OAuthSectionFile {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    // Explicit `null` counts as "no redirect URIs", same as a missing key.
    #[serde(default)]
    redirect_uris: Option<Vec<String>>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl OAuthSectionFile {
    fn into_client(self, section: OAuthSection) -> OAuthClient {
        OAuthClient {
            section,
            client_id: self.client_id.unwrap_or_default(),
            client_secret: self.client_secret.unwrap_or_default(),
            redirect_uris: self.redirect_uris.unwrap_or_default(),
            auth_uri: self.auth_uri.unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: self.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        }
    }
}

pub async fn load(path: &Path) -> Result<Credentials, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let credentials = parse(&content).map_err(|err| match err {
        ParseFailure::Json(source) => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::Config(config) => config,
    })?;
    tracing::debug!(path = %path.display(), kind = credentials.kind(), "loaded credentials");
    Ok(credentials)
}

enum ParseFailure {
    Json(serde_json::Error),
    Config(ConfigError),
}

fn parse(content: &str) -> Result<Credentials, ParseFailure> {
    let file: CredentialsFile = serde_json::from_str(content).map_err(ParseFailure::Json)?;

    if file.kind.as_deref() == Some(SERVICE_ACCOUNT_TYPE) {
        let client_email = file
            .client_email
            .filter(|v| !v.is_empty())
            .ok_or(ParseFailure::Config(ConfigError::IncompleteServiceAccount {
                field: "client_email",
            }))?;
        let private_key = file
            .private_key
            .filter(|v| !v.is_empty())
            .ok_or(ParseFailure::Config(ConfigError::IncompleteServiceAccount {
                field: "private_key",
            }))?;
        return Ok(Credentials::ServiceAccount(ServiceAccountCredentials {
            client_email,
            private_key,
            token_uri: file.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        }));
    }

    if let Some(installed) = file.installed {
        return Ok(Credentials::OAuth(installed.into_client(OAuthSection::Installed)));
    }
    if let Some(web) = file.web {
        return Ok(Credentials::OAuth(web.into_client(OAuthSection::Web)));
    }
    Err(ParseFailure::Config(ConfigError::UnrecognizedShape))
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::OAuth(_) => "oauth",
            Credentials::ServiceAccount(_) => "service_account",
        }
    }
}
