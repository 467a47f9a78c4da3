use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::gmail_api::auth::AccessTokenSource;
use crate::types::{Message, MessagesResponse};

/// Headers kept in a metadata fetch; everything else is dropped server-side.
pub const METADATA_HEADERS: [&str; 4] = ["From", "To", "Subject", "Date"];

// The two Gmail calls the archiver depends on, as a trait so tests can stub them
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailApi: Send + Sync {
    async fn list_messages(
        &self,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagesResponse, Error>;

    async fn get_message_metadata(&self, id: &str) -> Result<Message, Error>;
}

pub struct GmailClient<T> {
    http: reqwest::Client,
    base_url: String,
    auth: T,
}

impl<T: AccessTokenSource> GmailClient<T> {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, auth: T) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }
}

#[async_trait]
impl<T: AccessTokenSource> MailApi for GmailClient<T> {
    async fn list_messages(
        &self,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagesResponse, Error> {
        let token = self.auth.access_token().await?;
        let mut query = vec![("maxResults", max_results.to_string())];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token));
        }

        let response = self
            .http
            .get(format!("{}/messages", self.base_url))
            .query(&query)
            .bearer_auth(&token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn get_message_metadata(&self, id: &str) -> Result<Message, Error> {
        let token = self.auth.access_token().await?;
        let mut query = vec![("format", "metadata")];
        query.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", *h)));

        let response = self
            .http
            .get(format!("{}/messages/{}", self.base_url, id))
            .query(&query)
            .bearer_auth(&token)
            .send()
            .await?;
        read_json(response).await
    }
}

// Helper function to decode a success body or classify an error body
async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, Error> {
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

/// Walks the full message listing, following `nextPageToken` until the API
/// stops returning one. Any failed page aborts the walk.
pub async fn list_all_message_ids<A: MailApi + ?Sized>(
    api: &A,
    page_size: u32,
) -> Result<Vec<String>, Error> {
    let mut ids = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = api.list_messages(page_token.take(), page_size).await?;
        pages += 1;
        ids.extend(
            page.messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id),
        );

        match page.next_page_token {
            Some(next) if !next.is_empty() => {
                tracing::debug!(page = pages, total = ids.len(), "fetching next page");
                page_token = Some(next);
            }
            _ => break,
        }
    }

    tracing::debug!(pages, total = ids.len(), "message listing complete");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail_api::auth::MockAccessTokenSource;
    use crate::types::MessageRef;
    use mockall::Sequence;

    fn page(ids: &[String], next: Option<&str>) -> MessagesResponse {
        MessagesResponse {
            messages: Some(
                ids.iter()
                    .map(|id| MessageRef {
                        id: Some(id.clone()),
                        thread_id: None,
                    })
                    .collect(),
            ),
            next_page_token: next.map(String::from),
            result_size_estimate: None,
        }
    }

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let sizes = [100usize, 100, 37];
        let all: Vec<Vec<String>> = sizes
            .iter()
            .enumerate()
            .map(|(p, &n)| (0..n).map(|i| format!("m{p}-{i}")).collect())
            .collect();

        let mut api = MockMailApi::new();
        let mut seq = Sequence::new();
        for (p, ids) in all.iter().cloned().enumerate() {
            let expected_cursor = if p == 0 { None } else { Some(format!("c{p}")) };
            let next = if p + 1 < sizes.len() {
                Some(format!("c{}", p + 1))
            } else {
                None
            };
            api.expect_list_messages()
                .withf(move |cursor, max| *cursor == expected_cursor && *max == 100)
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(page(&ids, next.as_deref())));
        }

        let ids = list_all_message_ids(&api, 100).await.unwrap();
        let expected: Vec<String> = all.into_iter().flatten().collect();
        assert_eq!(ids.len(), 237);
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn page_without_messages_contributes_nothing() {
        let mut api = MockMailApi::new();
        let mut seq = Sequence::new();
        api.expect_list_messages()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(MessagesResponse {
                    messages: None,
                    next_page_token: Some("next".to_string()),
                    result_size_estimate: Some(0),
                })
            });
        api.expect_list_messages()
            .withf(|cursor, _| cursor.as_deref() == Some("next"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["z".to_string()], None)));

        let ids = list_all_message_ids(&api, 100).await.unwrap();
        assert_eq!(ids, vec!["z".to_string()]);
    }

    #[tokio::test]
    async fn empty_cursor_ends_the_walk() {
        let mut api = MockMailApi::new();
        api.expect_list_messages()
            .times(1)
            .returning(|_, _| Ok(page(&["a".to_string()], Some(""))));

        let ids = list_all_message_ids(&api, 100).await.unwrap();
        assert_eq!(ids, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn page_failure_is_propagated() {
        let mut api = MockMailApi::new();
        let mut seq = Sequence::new();
        api.expect_list_messages()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["a".to_string()], Some("c1"))));
        api.expect_list_messages()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(Error::UnauthorizedClient {
                    detail: "unauthorized_client".to_string(),
                })
            });

        let err = list_all_message_ids(&api, 100).await.unwrap_err();
        assert!(err.is_unauthorized_client());
    }

    #[tokio::test]
    async fn token_failure_stops_a_request_before_it_is_sent() {
        let mut auth = MockAccessTokenSource::new();
        auth.expect_access_token()
            .times(1)
            .returning(|| Err(Error::Auth("no token".to_string())));
        // Unroutable base URL: reaching the network would surface as Error::Http.
        let client = GmailClient::new(reqwest::Client::new(), "http://127.0.0.1:9/", auth);

        let err = client.list_messages(None, 100).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
