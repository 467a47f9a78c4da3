use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub struct MessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(rename = "resultSizeEstimate")]
    pub result_size_estimate: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessageRef {
    pub id: Option<String>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Message {
    pub id: Option<String>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub headers: Option<Vec<Header>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What gets written to `<data_dir>/<id>.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(rename = "labelIds")]
    pub label_ids: Vec<String>,
    pub snippet: String,
    pub headers: Vec<Header>,
}

impl MessageRecord {
    /// The record is keyed by the id that was requested, whatever the body says.
    pub fn from_message(message: Message, requested_id: &str) -> Self {
        Self {
            id: requested_id.to_string(),
            thread_id: message.thread_id,
            label_ids: message.label_ids.unwrap_or_default(),
            snippet: message.snippet.unwrap_or_default(),
            headers: message
                .payload
                .and_then(|payload| payload.headers)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_response_maps_to_record() {
        let json = r#"{
            "id": "18c0f",
            "threadId": "18c0e",
            "labelIds": ["INBOX", "UNREAD"],
            "snippet": "Lunch on Friday?",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "From", "value": "ana@example.com"},
                    {"name": "Subject", "value": "Lunch"}
                ]
            },
            "sizeEstimate": 4211
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        let record = MessageRecord::from_message(message, "18c0f");

        assert_eq!(record.id, "18c0f");
        assert_eq!(record.thread_id.as_deref(), Some("18c0e"));
        assert_eq!(record.label_ids, vec!["INBOX", "UNREAD"]);
        assert_eq!(record.snippet, "Lunch on Friday?");
        assert_eq!(
            record.headers,
            vec![
                Header::new("From", "ana@example.com"),
                Header::new("Subject", "Lunch")
            ]
        );
    }

    #[test]
    fn sparse_message_still_has_every_field() {
        let record = MessageRecord::from_message(Message::default(), "abc");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "abc");
        assert!(value["threadId"].is_null());
        assert_eq!(value["labelIds"], serde_json::json!([]));
        assert_eq!(value["snippet"], "");
        assert_eq!(value["headers"], serde_json::json!([]));
    }

    #[test]
    fn requested_id_wins_over_body_id() {
        let message = Message {
            id: Some("from-body".to_string()),
            ..Message::default()
        };
        assert_eq!(MessageRecord::from_message(message, "requested").id, "requested");
    }

    #[test]
    fn list_page_without_messages_parses() {
        let page: MessagesResponse =
            serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(page.messages.is_none());
        assert!(page.next_page_token.is_none());
    }
}
