//! Locates the message already tracking a pipeline execution.

use anyhow::Result;

use crate::fragments::ChannelMessage;
use crate::transport::ChatTransport;

/// True when any attachment footer equals `execution_id` exactly.
pub fn message_matches_execution(message: &ChannelMessage, execution_id: &str) -> bool {
    message
        .fragments
        .iter()
        .any(|fragment| fragment.footer.as_deref() == Some(execution_id))
}

pub async fn locate_execution_message(
    transport: &dyn ChatTransport,
    channel_id: &str,
    execution_id: &str,
) -> Result<Option<ChannelMessage>> {
    let predicate =
        |message: &ChannelMessage| message_matches_execution(message, execution_id);
    transport.find_message(channel_id, &predicate).await
}
