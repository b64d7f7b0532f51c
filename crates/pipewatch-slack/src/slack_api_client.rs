//! Slack Web API client used for posting, updating and searching notifications.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use pipewatch_notify::{NotificationFragment, PostedMessage};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::slack_helpers::{
    is_retryable_slack_status, is_retryable_transport_error, looks_like_channel_id,
    normalize_channel_name, slack_retry_after, truncate_for_error, SlackRetryPolicy,
};

const CONVERSATIONS_LIST_PAGE_LIMIT: usize = 200;
const CONVERSATIONS_LIST_MAX_PAGES: usize = 50;

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackHistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackHistoryMessage>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackConversationsListResponse {
    ok: bool,
    #[serde(default)]
    channels: Vec<SlackChannel>,
    #[serde(default)]
    response_metadata: Option<SlackResponseMetadata>,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// A message as returned by `conversations.history`.
pub struct SlackHistoryMessage {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<NotificationFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_policy: SlackRetryPolicy,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("pipewatch"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            retry_policy: SlackRetryPolicy::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    pub async fn post_message(
        &self,
        channel: &str,
        attachments: &[NotificationFragment],
    ) -> Result<PostedMessage> {
        let payload = json!({
            "channel": channel,
            "text": "",
            "attachments": attachments,
        });

        let response: SlackChatMessageResponse = self
            .request_json("chat.postMessage", || {
                self.http
                    .post(format!("{}/chat.postMessage", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;

        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        attachments: &[NotificationFragment],
    ) -> Result<PostedMessage> {
        let payload = json!({
            "channel": channel,
            "ts": ts,
            "text": "",
            "attachments": attachments,
        });
        let response: SlackChatMessageResponse = self
            .request_json("chat.update", || {
                self.http
                    .post(format!("{}/chat.update", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        if !response.ok {
            bail!(
                "slack chat.update failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response.ts.unwrap_or_else(|| ts.to_string()),
        })
    }

    /// Fetches up to `limit` of the newest messages in `channel`, newest first.
    pub async fn conversation_history(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<SlackHistoryMessage>> {
        let limit = limit.max(1).to_string();
        let response: SlackHistoryResponse = self
            .request_json("conversations.history", || {
                self.http
                    .get(format!("{}/conversations.history", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[("channel", channel), ("limit", limit.as_str())])
            })
            .await?;
        if !response.ok {
            bail!(
                "slack conversations.history failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(response.messages)
    }

    /// Resolves a channel id or `#name` to a channel, paging through
    /// `conversations.list` when a name is given.
    pub async fn resolve_channel(&self, reference: &str) -> Result<SlackChannel> {
        let name = normalize_channel_name(reference);
        if name.is_empty() {
            bail!("slack channel reference cannot be empty");
        }
        if looks_like_channel_id(name) {
            return Ok(SlackChannel {
                id: name.to_string(),
                name: name.to_string(),
            });
        }

        let mut cursor = String::new();
        let mut pages = 0_usize;
        loop {
            pages = pages.saturating_add(1);
            let (channels, next_cursor) = self.list_channels_page(&cursor).await?;
            if let Some(channel) = channels.into_iter().find(|channel| channel.name == name) {
                tracing::debug!(
                    channel = %channel.id,
                    name = %channel.name,
                    pages,
                    "resolved slack channel"
                );
                return Ok(channel);
            }
            if next_cursor.trim().is_empty() {
                bail!("slack channel '#{name}' not found or not visible to the bot");
            }
            if pages >= CONVERSATIONS_LIST_MAX_PAGES {
                bail!("slack channel '#{name}' not found within {pages} conversations.list pages");
            }
            cursor = next_cursor;
        }
    }

    async fn list_channels_page(&self, cursor: &str) -> Result<(Vec<SlackChannel>, String)> {
        let limit = CONVERSATIONS_LIST_PAGE_LIMIT.to_string();
        let response: SlackConversationsListResponse = self
            .request_json("conversations.list", || {
                let mut query = vec![
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", limit.as_str()),
                ];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor));
                }
                self.http
                    .get(format!("{}/conversations.list", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&query)
            })
            .await?;
        if !response.ok {
            bail!(
                "slack conversations.list failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        let next_cursor = response
            .response_metadata
            .map(|metadata| metadata.next_cursor)
            .unwrap_or_default();
        Ok((response.channels, next_cursor))
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(
                    "x-pipewatch-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode slack {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = slack_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if self.retry_policy.allows_another_attempt(attempt)
                        && is_retryable_slack_status(status)
                    {
                        tracing::warn!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying slack api request"
                        );
                        tokio::time::sleep(self.retry_policy.delay_after(attempt, retry_after))
                            .await;
                        continue;
                    }

                    bail!(
                        "slack api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if self.retry_policy.allows_another_attempt(attempt)
                        && is_retryable_transport_error(&error)
                    {
                        tracing::warn!(
                            operation,
                            attempt,
                            "retrying slack api request after transport error"
                        );
                        tokio::time::sleep(self.retry_policy.delay_after(attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {operation} request failed"));
                }
            }
        }
    }
}
