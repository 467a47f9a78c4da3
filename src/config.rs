use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::gmail_api::auth::GMAIL_READONLY_SCOPE;

pub const CREDENTIALS_PATH_ENV: &str = "CREDENTIALS_PATH";
pub const IMPERSONATE_USER_ENV: &str = "GMAIL_IMPERSONATE_USER";

pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

pub const DEFAULT_PAGE_SIZE: u32 = 100;
// messages.list rejects maxResults above this.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Everything a run needs to know about where things live and what it may
/// ask for. Components receive this explicitly instead of reading globals.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub data_dir: PathBuf,
    pub scopes: Vec<String>,
    pub impersonate_user: Option<String>,
    pub page_size: u32,
    pub api_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
            impersonate_user: None,
            page_size: DEFAULT_PAGE_SIZE,
            api_base: GMAIL_API_BASE.to_string(),
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self::from_cli_with_env(cli, std::env::var(CREDENTIALS_PATH_ENV).ok())
    }

    pub fn from_cli_with_env(cli: &Cli, credentials_env: Option<String>) -> Self {
        Self {
            credentials_path: resolve_credentials_path(credentials_env, cli.credentials.as_deref()),
            token_path: cli.token_path.clone(),
            data_dir: cli.data_dir.clone(),
            impersonate_user: cli
                .impersonate
                .clone()
                .filter(|user| !user.trim().is_empty()),
            page_size: cli.page_size.clamp(1, MAX_PAGE_SIZE),
            ..Self::default()
        }
    }
}

/// The environment wins over the command line, which wins over the default.
/// Empty values count as unset.
pub fn resolve_credentials_path(env_value: Option<String>, arg: Option<&Path>) -> PathBuf {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return PathBuf::from(value);
    }
    match arg {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => PathBuf::from(DEFAULT_CREDENTIALS_PATH),
    }
}
