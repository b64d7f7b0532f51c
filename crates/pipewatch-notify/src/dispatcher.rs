//! Event dispatch: locate, build, then post or merge-and-update.

use std::sync::Arc;

use anyhow::{Context, Result};
use pipewatch_events::{EventKind, LifecycleEvent};

use crate::fragments::{merge_fragment, PostedMessage};
use crate::locator::locate_execution_message;
use crate::presentation::build_fragment;
use crate::transport::ChatTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of handling one lifecycle event.
pub enum DispatchOutcome {
    Posted(PostedMessage),
    Updated(PostedMessage),
    /// Stage or action event with no message to attach to.
    Dropped(EventKind),
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posted(_) => "posted",
            Self::Updated(_) => "updated",
            Self::Dropped(_) => "dropped",
        }
    }

    pub fn message(&self) -> Option<&PostedMessage> {
        match self {
            Self::Posted(message) | Self::Updated(message) => Some(message),
            Self::Dropped(_) => None,
        }
    }
}

#[derive(Clone)]
/// Routes lifecycle events for one channel through a chat transport.
pub struct PipelineNotifier {
    transport: Arc<dyn ChatTransport>,
    channel_id: String,
}

impl PipelineNotifier {
    pub fn new(transport: Arc<dyn ChatTransport>, channel_id: impl Into<String>) -> Self {
        Self {
            transport,
            channel_id: channel_id.into(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Handles one event end-to-end with at most one post or update call.
    ///
    /// Only pipeline-level events create messages. Stage and action events
    /// that arrive before their execution's message exists are dropped, not
    /// buffered. Transport failures propagate without retry.
    pub async fn handle_event(&self, event: &LifecycleEvent) -> Result<DispatchOutcome> {
        let execution_id = event.execution_id();
        let existing =
            locate_execution_message(self.transport.as_ref(), &self.channel_id, execution_id)
                .await
                .with_context(|| {
                    format!("failed to search channel history for execution {execution_id}")
                })?;

        let kind = event.kind();
        let fragment = build_fragment(event);

        let Some(message) = existing else {
            return match kind {
                EventKind::Pipeline => {
                    let posted = self
                        .transport
                        .post_message(&self.channel_id, std::slice::from_ref(&fragment))
                        .await
                        .with_context(|| {
                            format!("failed to post notification for execution {execution_id}")
                        })?;
                    tracing::info!(
                        execution_id,
                        pipeline = event.pipeline(),
                        channel = %posted.channel,
                        ts = %posted.ts,
                        "posted pipeline notification"
                    );
                    Ok(DispatchOutcome::Posted(posted))
                }
                EventKind::Stage | EventKind::Action => {
                    tracing::debug!(
                        execution_id,
                        pipeline = event.pipeline(),
                        kind = kind.as_str(),
                        "dropping event without a pipeline notification to update"
                    );
                    Ok(DispatchOutcome::Dropped(kind))
                }
            };
        };

        let title = fragment.title.clone();
        let fragments = merge_fragment(
            &message.fragments,
            |candidate| candidate.title == title,
            fragment,
        );
        let updated = self
            .transport
            .update_message(&self.channel_id, &message.ts, &fragments)
            .await
            .with_context(|| {
                format!(
                    "failed to update notification {} for execution {execution_id}",
                    message.ts
                )
            })?;
        tracing::info!(
            execution_id,
            pipeline = event.pipeline(),
            kind = kind.as_str(),
            ts = %updated.ts,
            attachments = fragments.len(),
            "updated pipeline notification"
        );
        Ok(DispatchOutcome::Updated(updated))
    }
}
