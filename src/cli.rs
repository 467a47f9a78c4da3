use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    Settings, DEFAULT_DATA_DIR, DEFAULT_PAGE_SIZE, DEFAULT_TOKEN_PATH, IMPERSONATE_USER_ENV,
};
use crate::error::{ConfigError, Error};
use crate::gmail_api::token::TokenStore;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// OAuth2 client or service account JSON. CREDENTIALS_PATH takes precedence.
    pub credentials: Option<PathBuf>,

    /// Where the OAuth2 user token is cached between runs.
    #[clap(long, default_value = DEFAULT_TOKEN_PATH)]
    pub token_path: PathBuf,

    /// Directory that receives one JSON file per message.
    #[clap(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Mailbox a service account acts on behalf of.
    #[clap(long, env = IMPERSONATE_USER_ENV)]
    pub impersonate: Option<String>,

    /// Message ids requested per listing page.
    #[clap(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Delete the cached OAuth2 token and exit.
    #[clap(long)]
    pub clear_token: bool,
}

pub async fn handle_token_clear(settings: &Settings) -> Result<(), Error> {
    let store = TokenStore::new(&settings.token_path);
    if store.clear().await? {
        println!("Token removed from {}. Exiting.", store.path().display());
    } else {
        println!("No token stored at {}. Exiting.", store.path().display());
    }
    Ok(())
}

pub fn report_config_error(err: &ConfigError) {
    eprintln!("{}", err);
    if let ConfigError::MissingRedirectUri { .. } = err {
        eprintln!(
            "For command-line use, create \"Desktop app\" (Installed) OAuth2 credentials \
             (which include redirect_uris), or add an authorized redirect URI to your \
             Web application client (e.g. http://localhost)."
        );
    }
}

/// Remediation for `unauthorized_client`, covering both credential kinds since
/// the API does not say which mistake was made.
pub fn unauthorized_client_guidance(scopes: &[String]) -> Vec<String> {
    vec![
        "Gmail API authorization error: unauthorized_client".to_string(),
        "  - If using a service account, ensure you have enabled domain-wide delegation".to_string(),
        format!(
            "    in your G Suite Admin console and granted access to the scope(s): {}",
            scopes.join(", ")
        ),
        "  - For personal Gmail accounts, service accounts cannot be used; use OAuth2 user credentials instead."
            .to_string(),
    ]
}

pub fn report_unauthorized_client(settings: &Settings) {
    for line in unauthorized_client_guidance(&settings.scopes) {
        eprintln!("{}", line);
    }
}
