//! Notification core for pipewatch.
//!
//! Turns classified CodePipeline lifecycle events into chat attachments and
//! decides whether to post a new message or merge into the message already
//! tracking the same pipeline execution.

pub mod dispatcher;
pub mod fragments;
pub mod locator;
pub mod presentation;
pub mod transport;

pub use dispatcher::{DispatchOutcome, PipelineNotifier};
pub use fragments::{merge_fragment, ChannelMessage, NotificationFragment, PostedMessage};
pub use locator::{locate_execution_message, message_matches_execution};
pub use presentation::{
    action_fragment, build_fragment, pipeline_fragment, stage_fragment, status_color,
    status_phrase, StatusColor,
};
pub use transport::{ChatTransport, MessagePredicate};
