//! Chat transport seam used by the dispatcher and message locator.

use anyhow::Result;
use async_trait::async_trait;

use crate::fragments::{ChannelMessage, NotificationFragment, PostedMessage};

/// Predicate the core hands to the transport when searching channel history.
pub type MessagePredicate<'a> = &'a (dyn Fn(&ChannelMessage) -> bool + Send + Sync);

#[async_trait]
/// Outbound chat operations. Implementations own auth, pagination and timeouts.
pub trait ChatTransport: Send + Sync {
    /// Returns the most recent message in `channel_id` satisfying `predicate`.
    async fn find_message(
        &self,
        channel_id: &str,
        predicate: MessagePredicate<'_>,
    ) -> Result<Option<ChannelMessage>>;

    /// Posts a new message with empty primary text.
    async fn post_message(
        &self,
        channel_id: &str,
        fragments: &[NotificationFragment],
    ) -> Result<PostedMessage>;

    /// Replaces the full attachment list of message `ts` with empty primary text.
    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        fragments: &[NotificationFragment],
    ) -> Result<PostedMessage>;
}
