use std::path::PathBuf;

use thiserror::Error;
use yup_oauth2::error::AuthErrorCode;

use crate::credentials::OAuthSection;

/// OAuth error code the Gmail API and Google's token endpoint return when a
/// client is not allowed to act for the requested account.
pub const UNAUTHORIZED_CLIENT: &str = "unauthorized_client";

/// Problems with the local credential setup. All of these are fatal to a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read credentials file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("OAuth2 credentials JSON must contain an \"installed\" or \"web\" property.")]
    UnrecognizedShape,

    #[error("No redirect_uris found in credentials JSON under \"{section}\".")]
    MissingRedirectUri { section: OAuthSection },

    #[error(
        "Service account credentials require impersonation of a user. \
         Set the GMAIL_IMPERSONATE_USER environment variable to the target Gmail address."
    )]
    MissingImpersonationSubject,

    #[error("service account credentials are missing \"{field}\"")]
    IncompleteServiceAccount { field: &'static str },

    #[error("invalid service account key: {0}")]
    InvalidServiceAccountKey(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The API or token endpoint rejected the client with `unauthorized_client`.
    #[error("Gmail API authorization error: unauthorized_client ({detail})")]
    UnauthorizedClient { detail: String },

    #[error("Gmail API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify a non-success HTTP response body.
    ///
    /// Token endpoints report failures as `{"error": "<code>", ...}`. Only that
    /// string form can carry `unauthorized_client`; the Gmail API's structured
    /// `{"error": {"code": ..}}` bodies fall through to [`Error::Api`].
    pub fn from_response_body(status: u16, body: String) -> Self {
        let code = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned));

        match code.as_deref() {
            Some(UNAUTHORIZED_CLIENT) => Error::UnauthorizedClient { detail: body },
            _ => Error::Api { status, body },
        }
    }

    pub fn is_unauthorized_client(&self) -> bool {
        matches!(self, Error::UnauthorizedClient { .. })
    }
}

impl From<yup_oauth2::Error> for Error {
    fn from(err: yup_oauth2::Error) -> Self {
        match err {
            yup_oauth2::Error::AuthError(auth) => {
                if matches!(auth.error, AuthErrorCode::UnauthorizedClient) {
                    Error::UnauthorizedClient {
                        detail: auth
                            .error_description
                            .unwrap_or_else(|| UNAUTHORIZED_CLIENT.to_string()),
                    }
                } else {
                    Error::Auth(auth.to_string())
                }
            }
            other => Error::Auth(other.to_string()),
        }
    }
}
