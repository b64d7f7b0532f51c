//! `ChatTransport` implementation backed by the Slack Web API.

use anyhow::Result;
use async_trait::async_trait;
use pipewatch_notify::{
    ChannelMessage, ChatTransport, MessagePredicate, NotificationFragment, PostedMessage,
};

use crate::slack_api_client::SlackApiClient;

#[derive(Clone)]
pub struct SlackChatTransport {
    client: SlackApiClient,
    history_limit: usize,
}

impl SlackChatTransport {
    /// `history_limit` bounds how many recent messages a search inspects.
    pub fn new(client: SlackApiClient, history_limit: usize) -> Self {
        Self {
            client,
            history_limit: history_limit.max(1),
        }
    }

    pub fn client(&self) -> &SlackApiClient {
        &self.client
    }
}

#[async_trait]
impl ChatTransport for SlackChatTransport {
    async fn find_message(
        &self,
        channel_id: &str,
        predicate: MessagePredicate<'_>,
    ) -> Result<Option<ChannelMessage>> {
        let history = self
            .client
            .conversation_history(channel_id, self.history_limit)
            .await?;
        let scanned = history.len();
        let found = history
            .into_iter()
            .map(|message| ChannelMessage {
                channel: channel_id.to_string(),
                ts: message.ts,
                fragments: message.attachments,
            })
            .find(|message| predicate(message));
        tracing::debug!(
            channel = channel_id,
            scanned,
            matched = found.is_some(),
            "searched slack channel history"
        );
        Ok(found)
    }

    async fn post_message(
        &self,
        channel_id: &str,
        fragments: &[NotificationFragment],
    ) -> Result<PostedMessage> {
        self.client.post_message(channel_id, fragments).await
    }

    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        fragments: &[NotificationFragment],
    ) -> Result<PostedMessage> {
        self.client.update_message(channel_id, ts, fragments).await
    }
}
