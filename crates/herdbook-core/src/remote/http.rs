//! HTTP-backed remote document store client.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

use super::{Collection, RemoteDocument, RemoteStore, REMOTE_BATCH_LIMIT};

/// Client for the Herdbook cloud document API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    endpoint: String,
    auth_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl HttpRemoteStore {
    pub fn new(endpoint: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        let auth_token = auth_token.into().trim().to_string();
        if auth_token.is_empty() {
            return Err(Error::InvalidInput(
                "Remote store auth token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            auth_token,
            client: reqwest::Client::builder()
                .build()
                .map_err(|error| Error::Network(error.to_string()))?,
        })
    }

    fn collection_url(&self, user_id: &str, collection: Collection) -> String {
        format!("{}/v1/farms/{user_id}/{collection}", self.endpoint)
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Network(parse_api_error(status, &body)))
    }
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    documents: Vec<RemoteDocument>,
}

#[derive(Debug, serde::Serialize)]
struct BatchWrite {
    id: String,
    data: RemoteDocument,
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_collection(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteDocument>> {
        let response = self
            .client
            .get(self.collection_url(user_id, collection))
            .bearer_auth(&self.auth_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        let response = Self::check_response(response).await?;
        let payload = response
            .json::<CollectionResponse>()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;
        Ok(payload.documents)
    }

    async fn commit_batch(
        &self,
        user_id: &str,
        collection: Collection,
        writes: Vec<(String, RemoteDocument)>,
    ) -> Result<()> {
        if writes.len() > REMOTE_BATCH_LIMIT {
            return Err(Error::InvalidInput(format!(
                "Batch of {} writes exceeds the {REMOTE_BATCH_LIMIT}-write limit",
                writes.len()
            )));
        }
        if writes.is_empty() {
            return Ok(());
        }

        let writes: Vec<BatchWrite> = writes
            .into_iter()
            .map(|(id, data)| BatchWrite { id, data })
            .collect();

        let response = self
            .client
            .post(format!(
                "{}/batch",
                self.collection_url(user_id, collection)
            ))
            .bearer_auth(&self.auth_token)
            .json(&serde_json::json!({ "writes": writes }))
            .send()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn upsert_document(
        &self,
        user_id: &str,
        collection: Collection,
        id: &str,
        document: RemoteDocument,
    ) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/{id}", self.collection_url(user_id, collection)))
            .bearer_auth(&self.auth_token)
            .json(&document)
            .send()
            .await
            .map_err(|error| Error::Network(error.to_string()))?;

        Self::check_response(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        Error::InvalidInput("Remote store endpoint must not be empty".to_string())
    })?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "Remote store endpoint must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_endpoint("https://api.example.com/".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(HttpRemoteStore::new("https://api.example.com", "  ").is_err());
    }

    #[test]
    fn debug_redacts_auth_token() {
        let store = HttpRemoteStore::new("https://api.example.com", "secret-token").unwrap();
        let debug = format!("{store:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn collection_url_includes_farm_and_collection() {
        let store = HttpRemoteStore::new("https://api.example.com/", "token").unwrap();
        assert_eq!(
            store.collection_url("user-1", Collection::BreedingEvents),
            "https://api.example.com/v1/farms/user-1/breeding_events"
        );
    }

    #[test]
    fn parse_api_error_prefers_structured_message() {
        let message = parse_api_error(
            StatusCode::FORBIDDEN,
            r#"{"message": "farm access denied"}"#,
        );
        assert_eq!(message, "farm access denied (403)");

        let fallback = parse_api_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(fallback, "HTTP 502");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn commit_batch_rejects_oversized_batches() {
        let store = HttpRemoteStore::new("https://api.example.com", "token").unwrap();
        let writes = (0..=REMOTE_BATCH_LIMIT)
            .map(|index| (index.to_string(), RemoteDocument::new()))
            .collect();

        let error = store
            .commit_batch("user-1", Collection::Animals, writes)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("exceeds"));
    }
}
