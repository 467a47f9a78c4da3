use crate::archive::{archive_messages, ArchiveReport, MessageStore};
use crate::config::Settings;
use crate::credentials;
use crate::error::Error;
use crate::gmail_api::{authorize, list_all_message_ids, ConsentPrompt, GmailClient, MailApi};

/// Enumerate every message id, then archive whatever is not on disk yet.
pub async fn archive_account<A: MailApi + ?Sized>(
    api: &A,
    settings: &Settings,
) -> Result<ArchiveReport, Error> {
    let ids = list_all_message_ids(api, settings.page_size).await?;
    println!("Found {} messages.", ids.len());

    let store = MessageStore::new(&settings.data_dir);
    archive_messages(api, &store, &ids).await
}

// Load credentials, authorize, then archive
pub async fn run<P: ConsentPrompt>(settings: &Settings, prompt: &P) -> Result<ArchiveReport, Error> {
    let credentials = credentials::load(&settings.credentials_path).await?;
    let http = reqwest::Client::new();
    let client = authorize(settings, credentials, &http, prompt).await?;
    tracing::info!(
        service_account = client.is_service_account(),
        "authorized Gmail client"
    );

    let gmail = GmailClient::new(http, settings.api_base.clone(), client);
    archive_account(&gmail, settings).await
}
