use crate::core::error::{AppError, AppResult};
use crate::core::models::Message;
use crate::core::parser;
use crate::infrastructure::token::TokenProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Provider-side label handle.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderLabel {
    pub id: String,
    pub name: String,
}

/// Mail provider operations the triage pipeline depends on.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List ids of unread messages matching the query, bounded by `max`.
    async fn list_unread(&self, query: &str, max: usize) -> AppResult<Vec<String>>;

    /// Fetch one message's subject, sender address and snippet.
    async fn fetch_message(&self, id: &str) -> AppResult<Message>;

    async fn list_labels(&self) -> AppResult<Vec<ProviderLabel>>;

    async fn create_label(&self, name: &str) -> AppResult<ProviderLabel>;

    async fn apply_label(&self, message_id: &str, label_id: &str) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<ProviderLabel>,
}

/// Gmail REST client, authenticated per request with the current bearer
/// token from the shared [`TokenProvider`].
pub struct GmailClient {
    http: Client,
    base: String,
    tokens: Arc<TokenProvider>,
}

impl GmailClient {
    pub fn new(base: String, tokens: Arc<TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, base, tokens })
    }

    async fn get_json<R>(&self, url: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(self.tokens.current())
            .send()
            .await
            .context(format!("GET {} failed", url))?;

        Self::decode(url, response).await
    }

    async fn post_json<R>(&self, url: &str, body: serde_json::Value) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .bearer_auth(self.tokens.current())
            .json(&body)
            .send()
            .await
            .context(format!("POST {} failed", url))?;

        Self::decode(url, response).await
    }

    async fn decode<R>(url: &str, response: reqwest::Response) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", url, status, body);
        }

        response
            .json()
            .await
            .context(format!("Failed to decode response from {}", url))
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_unread(&self, query: &str, max: usize) -> AppResult<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base);
        let list: MessageListResponse = self
            .get_json(
                &url,
                &[
                    ("q", query.to_string()),
                    ("maxResults", max.to_string()),
                ],
            )
            .await
            .map_err(|e| AppError::Provider(format!("listing messages: {:#}", e)))?;

        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(&self, id: &str) -> AppResult<Message> {
        let url = format!("{}/users/me/messages/{}", self.base, id);
        let msg: MessageResponse = self.get_json(&url, &[]).await.map_err(|e| AppError::Fetch {
            message_id: id.to_string(),
            reason: format!("{:#}", e),
        })?;

        let headers = msg.payload.unwrap_or_default().headers;
        let header = |name: &str| {
            headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.clone())
                .unwrap_or_default()
        };

        Ok(Message {
            id: msg.id,
            subject: header("Subject"),
            sender: parser::sender_address(&header("From")),
            snippet: msg.snippet,
        })
    }

    async fn list_labels(&self) -> AppResult<Vec<ProviderLabel>> {
        let url = format!("{}/users/me/labels", self.base);
        let list: LabelListResponse = self
            .get_json(&url, &[])
            .await
            .map_err(|e| AppError::Provider(format!("listing labels: {:#}", e)))?;

        Ok(list.labels)
    }

    async fn create_label(&self, name: &str) -> AppResult<ProviderLabel> {
        let url = format!("{}/users/me/labels", self.base);
        let body = json!({
            "name": name,
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show",
        });

        let label: ProviderLabel = self
            .post_json(&url, body)
            .await
            .map_err(|e| AppError::Provider(format!("creating label '{}': {:#}", name, e)))?;

        info!("Created label '{}' with id {}", label.name, label.id);
        Ok(label)
    }

    async fn apply_label(&self, message_id: &str, label_id: &str) -> AppResult<()> {
        let url = format!("{}/users/me/messages/{}/modify", self.base, message_id);
        let body = json!({ "addLabelIds": [label_id] });

        let _: serde_json::Value =
            self.post_json(&url, body)
                .await
                .map_err(|e| AppError::LabelApply {
                    message_id: message_id.to_string(),
                    reason: format!("{:#}", e),
                })?;

        Ok(())
    }
}
