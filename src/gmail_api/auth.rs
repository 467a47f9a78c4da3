use std::io::{BufRead, Write};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::config::Settings;
use crate::credentials::{Credentials, OAuthClient, ServiceAccountCredentials};
use crate::error::{ConfigError, Error};
use crate::gmail_api::token::{Token, TokenResponse, TokenStore};

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

// Anything that can hand out a bearer token for Gmail requests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, Error>;
}

// The interactive half of the consent flow, separated out so tests never block on stdin
#[cfg_attr(test, mockall::automock)]
pub trait ConsentPrompt {
    fn request_code(&self, auth_url: &str) -> Result<String, Error>;
}

/// Prints the consent URL and blocks until a line arrives on stdin.
pub struct ConsolePrompt;

impl ConsentPrompt for ConsolePrompt {
    fn request_code(&self, auth_url: &str) -> Result<String, Error> {
        println!("Authorize this app by visiting this url: {}", auth_url);
        print!("Enter the code from that page here: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Service account signer acting on behalf of one mailbox. Short-lived tokens
/// are minted and cached by yup-oauth2 as requests need them.
pub struct ServiceAccountSigner {
    authenticator: DefaultAuthenticator,
    scopes: Vec<String>,
}

impl ServiceAccountSigner {
    pub async fn new(
        credentials: ServiceAccountCredentials,
        subject: String,
        scopes: Vec<String>,
    ) -> Result<Self, Error> {
        let key: ServiceAccountKey = serde_json::from_value(serde_json::json!({
            "type": "service_account",
            "client_email": credentials.client_email,
            "private_key": credentials.private_key,
            "token_uri": credentials.token_uri,
        }))
        .map_err(|e| ConfigError::InvalidServiceAccountKey(e.to_string()))?;

        let authenticator = ServiceAccountAuthenticator::builder(key)
            .subject(subject)
            .build()
            .await
            .map_err(|e| ConfigError::InvalidServiceAccountKey(e.to_string()))?;

        Ok(Self {
            authenticator,
            scopes,
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountSigner {
    async fn access_token(&self) -> Result<String, Error> {
        let token = self.authenticator.token(self.scopes.as_slice()).await?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| Error::Auth("token endpoint returned no access token".to_string()))
    }
}

/// OAuth2 user credentials backed by the on-disk token cache.
pub struct UserSession {
    client: OAuthClient,
    http: reqwest::Client,
    store: TokenStore,
    token: Mutex<Token>,
}

impl UserSession {
    pub fn new(client: OAuthClient, http: reqwest::Client, store: TokenStore, token: Token) -> Self {
        Self {
            client,
            http,
            store,
            token: Mutex::new(token),
        }
    }

    pub async fn current_token(&self) -> Token {
        self.token.lock().await.clone()
    }
}

#[async_trait]
impl AccessTokenSource for UserSession {
    async fn access_token(&self) -> Result<String, Error> {
        let mut token = self.token.lock().await;
        if token.is_expired(Utc::now()) {
            if let Some(refresh_token) = token.refresh_token.clone() {
                tracing::info!("cached access token expired, refreshing");
                let response = request_token(
                    &self.http,
                    &self.client.token_uri,
                    &[
                        ("client_id", self.client.client_id.as_str()),
                        ("client_secret", self.client.client_secret.as_str()),
                        ("refresh_token", refresh_token.as_str()),
                        ("grant_type", "refresh_token"),
                    ],
                )
                .await?;
                let refreshed = token.clone().refreshed(response, Utc::now());
                self.store.save(&refreshed).await?;
                *token = refreshed;
            }
        }
        Ok(token.access_token.clone())
    }
}

/// An authorized handle usable by the message APIs, whichever flow produced it.
pub enum AuthorizedClient {
    ServiceAccount(ServiceAccountSigner),
    User(UserSession),
}

impl AuthorizedClient {
    pub fn is_service_account(&self) -> bool {
        matches!(self, AuthorizedClient::ServiceAccount(_))
    }
}

#[async_trait]
impl AccessTokenSource for AuthorizedClient {
    async fn access_token(&self) -> Result<String, Error> {
        match self {
            AuthorizedClient::ServiceAccount(signer) => signer.access_token().await,
            AuthorizedClient::User(session) => session.access_token().await,
        }
    }
}

// Main authorization function
pub async fn authorize<P: ConsentPrompt>(
    settings: &Settings,
    credentials: Credentials,
    http: &reqwest::Client,
    prompt: &P,
) -> Result<AuthorizedClient, Error> {
    match credentials {
        Credentials::ServiceAccount(service_account) => {
            let subject = settings
                .impersonate_user
                .clone()
                .filter(|s| !s.trim().is_empty())
                .ok_or(ConfigError::MissingImpersonationSubject)?;
            tracing::debug!(subject = %subject, "using service account with domain-wide delegation");
            let signer =
                ServiceAccountSigner::new(service_account, subject, settings.scopes.clone()).await?;
            Ok(AuthorizedClient::ServiceAccount(signer))
        }
        Credentials::OAuth(client) => {
            let redirect_uri = client
                .redirect_uri()
                .ok_or(ConfigError::MissingRedirectUri {
                    section: client.section,
                })?
                .to_string();
            let store = TokenStore::new(&settings.token_path);

            let token = match store.load().await {
                Some(token) if !token.is_expired(Utc::now()) || token.refresh_token.is_some() => {
                    tracing::debug!(path = %store.path().display(), "reusing cached token");
                    token
                }
                Some(_) => {
                    tracing::info!("cached token expired and cannot be refreshed");
                    obtain_new_token(&client, &redirect_uri, &settings.scopes, http, &store, prompt)
                        .await?
                }
                None => {
                    obtain_new_token(&client, &redirect_uri, &settings.scopes, http, &store, prompt)
                        .await?
                }
            };

            Ok(AuthorizedClient::User(UserSession::new(
                client,
                http.clone(),
                store,
                token,
            )))
        }
    }
}

pub fn consent_url(
    client: &OAuthClient,
    redirect_uri: &str,
    scopes: &[String],
) -> Result<reqwest::Url, Error> {
    let scope = scopes.join(" ");
    reqwest::Url::parse_with_params(
        &client.auth_uri,
        &[
            ("access_type", "offline"),
            ("scope", scope.as_str()),
            ("response_type", "code"),
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri),
        ],
    )
    .map_err(|e| Error::Auth(format!("invalid auth_uri {:?}: {}", client.auth_uri, e)))
}

// Helper function to run the interactive consent flow and persist the result
async fn obtain_new_token<P: ConsentPrompt>(
    client: &OAuthClient,
    redirect_uri: &str,
    scopes: &[String],
    http: &reqwest::Client,
    store: &TokenStore,
    prompt: &P,
) -> Result<Token, Error> {
    let url = consent_url(client, redirect_uri, scopes)?;
    let code = prompt.request_code(url.as_str())?;

    let response = request_token(
        http,
        &client.token_uri,
        &[
            ("code", code.as_str()),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;

    let token = Token::from_response(response, Utc::now());
    store.save(&token).await?;
    println!("Token stored to {}", store.path().display());
    Ok(token)
}

// Helper function to post a grant to the token endpoint
async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, Error> {
    let response = http.post(token_uri).form(form).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(Error::from_response_body(status.as_u16(), body))
    }
}
