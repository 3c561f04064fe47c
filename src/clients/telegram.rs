//! Thin Telegram Bot API client: `getUpdates` and `sendMessage` only.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const METHOD_GET_UPDATES: &str = "getUpdates";
const METHOD_SEND_MESSAGE: &str = "sendMessage";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Update {
    #[serde(rename = "update_id")]
    pub id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub from: Option<User>,
    pub chat: Chat,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Source of raw updates, ordered by strictly increasing id.
#[async_trait]
pub trait UpdatesApi: Send + Sync {
    async fn updates(&self, offset: i64, limit: usize) -> Result<Vec<Update>>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct TelegramClient {
    base_url: String,
    client: Client,
}

impl TelegramClient {
    /// `host` is usually `api.telegram.org`; a value with a scheme
    /// (e.g. `http://localhost:8081`) is used as-is for self-hosted Bot API servers.
    pub fn new(host: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            base_url: base_url(host, token),
            client,
        })
    }

    async fn do_request<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);

        // Strip the url from transport errors: it carries the bot token.
        let rsp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("telegram {method} request failed"))?;

        let body: ApiResponse<T> = rsp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("telegram {method}: can't decode response"))?;

        unwrap_response(method, body)
    }
}

fn base_url(host: &str, token: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        format!("{host}/bot{token}")
    } else {
        format!("https://{host}/bot{token}")
    }
}

fn unwrap_response<T>(method: &str, body: ApiResponse<T>) -> Result<T> {
    if !body.ok {
        return Err(anyhow!(
            "telegram {method} rejected: {}",
            body.description.unwrap_or_else(|| "no description".into())
        ));
    }
    body.result
        .ok_or_else(|| anyhow!("telegram {method}: ok response without result"))
}

#[async_trait]
impl UpdatesApi for TelegramClient {
    async fn updates(&self, offset: i64, limit: usize) -> Result<Vec<Update>> {
        self.do_request(
            METHOD_GET_UPDATES,
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        )
        .await
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .do_request(
                METHOD_SEND_MESSAGE,
                &[("chat_id", chat_id.to_string()), ("text", text.to_string())],
            )
            .await?;
        Ok(())
    }
}
