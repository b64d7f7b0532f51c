//! Slack Web API transport for pipewatch notifications.
//!
//! Implements `ChatTransport` on top of `chat.postMessage`, `chat.update` and
//! `conversations.history`, and resolves channel names through
//! `conversations.list`.

mod slack_api_client;
mod slack_helpers;
mod slack_transport;

pub use slack_api_client::{SlackApiClient, SlackChannel, SlackHistoryMessage};
pub use slack_transport::SlackChatTransport;
