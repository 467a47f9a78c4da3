use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use gmail_archive::app::archive_account;
use gmail_archive::archive::{archive_messages, MessageStore};
use gmail_archive::config::Settings;
use gmail_archive::gmail_api::MailApi;
use gmail_archive::types::{Header, Message, MessagePart, MessageRef, MessagesResponse};
use gmail_archive::Error;

// Stub Gmail account: one listing page, metadata for some ids, failures for the rest
struct StubMailbox {
    ids: Vec<String>,
    metadata: HashMap<String, Message>,
    fetched: Mutex<Vec<String>>,
}

impl StubMailbox {
    fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            metadata: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn with_message(mut self, message: Message) -> Self {
        let id = message.id.clone().unwrap();
        self.metadata.insert(id, message);
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailApi for StubMailbox {
    async fn list_messages(
        &self,
        _page_token: Option<String>,
        _max_results: u32,
    ) -> Result<MessagesResponse, Error> {
        Ok(MessagesResponse {
            messages: Some(
                self.ids
                    .iter()
                    .map(|id| MessageRef {
                        id: Some(id.clone()),
                        thread_id: None,
                    })
                    .collect(),
            ),
            next_page_token: None,
            result_size_estimate: Some(self.ids.len() as u64),
        })
    }

    async fn get_message_metadata(&self, id: &str) -> Result<Message, Error> {
        self.fetched.lock().unwrap().push(id.to_string());
        self.metadata.get(id).cloned().ok_or_else(|| Error::Api {
            status: 500,
            body: format!("backend error for {}", id),
        })
    }
}

fn message_a() -> Message {
    Message {
        id: Some("a".to_string()),
        snippet: Some("hi".to_string()),
        payload: Some(MessagePart {
            mime_type: None,
            headers: Some(vec![Header::new("From", "x@y.com")]),
        }),
        thread_id: Some("t1".to_string()),
        label_ids: Some(vec!["INBOX".to_string()]),
    }
}

fn settings_in(dir: &tempfile::TempDir) -> Settings {
    Settings {
        data_dir: dir.path().join("data"),
        token_path: dir.path().join("token.json"),
        ..Settings::default()
    }
}

#[tokio::test]
async fn archives_fetchable_messages_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);
    let mailbox = StubMailbox::new(&["a", "b"]).with_message(message_a());

    let report = archive_account(&mailbox, &settings).await.unwrap();

    assert_eq!(report.saved, vec!["a".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "b");
    assert!(report.failed[0].1.contains("b"));

    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(settings.data_dir.join("a.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        written,
        serde_json::json!({
            "id": "a",
            "threadId": "t1",
            "labelIds": ["INBOX"],
            "snippet": "hi",
            "headers": [{"name": "From", "value": "x@y.com"}]
        })
    );
    assert!(!settings.data_dir.join("b.json").exists());
    assert_eq!(mailbox.fetched(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn rerun_skips_already_archived_messages() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);

    let first = StubMailbox::new(&["a", "b"]).with_message(message_a());
    archive_account(&first, &settings).await.unwrap();
    let before = std::fs::read_to_string(settings.data_dir.join("a.json")).unwrap();

    let second = StubMailbox::new(&["a", "b"]).with_message(message_a());
    let report = archive_account(&second, &settings).await.unwrap();

    assert_eq!(report.skipped, vec!["a".to_string()]);
    assert_eq!(second.fetched(), vec!["b".to_string()]);
    assert_eq!(
        std::fs::read_to_string(settings.data_dir.join("a.json")).unwrap(),
        before
    );
}

#[tokio::test]
async fn written_record_is_pretty_printed() {
    let dir = tempfile::tempdir().unwrap();
    let store = MessageStore::new(dir.path());
    let mailbox = StubMailbox::new(&["a"]).with_message(message_a());

    archive_messages(&mailbox, &store, &["a".to_string()])
        .await
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("a.json")).unwrap();
    assert!(raw.starts_with("{\n  \"id\": \"a\""));
}

#[tokio::test]
async fn listing_failure_aborts_before_archiving() {
    struct Rejecting;

    #[async_trait]
    impl MailApi for Rejecting {
        async fn list_messages(
            &self,
            _page_token: Option<String>,
            _max_results: u32,
        ) -> Result<MessagesResponse, Error> {
            Err(Error::from_response_body(
                401,
                r#"{"error":"unauthorized_client"}"#.to_string(),
            ))
        }

        async fn get_message_metadata(&self, _id: &str) -> Result<Message, Error> {
            panic!("no message should be fetched after a listing failure");
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);

    let err = archive_account(&Rejecting, &settings).await.unwrap_err();
    assert!(err.is_unauthorized_client());
    assert!(!settings.data_dir.exists());
}
