//! Shared fixtures for binary-level tests.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use pipewatch_notify::{
    ChannelMessage, ChatTransport, MessagePredicate, NotificationFragment, PostedMessage,
};
use serde_json::{json, Value};
use sha2::Sha256;

pub(crate) fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(payload);
    let digest = mac.finalize().into_bytes();
    let hex = digest
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    format!("sha256={hex}")
}

pub(crate) fn pipeline_event_json(execution_id: &str, state: &str) -> Value {
    json!({
        "version": "0",
        "id": "event-1",
        "detail-type": "CodePipeline Pipeline Execution State Change",
        "source": "aws.codepipeline",
        "account": "123456789012",
        "time": "2024-05-01T10:00:00Z",
        "region": "eu-west-1",
        "resources": [],
        "detail": {
            "pipeline": "checkout",
            "version": 4,
            "state": state,
            "execution-id": execution_id
        }
    })
}

pub(crate) fn stage_event_json(execution_id: &str, stage: &str, state: &str) -> Value {
    json!({
        "version": "0",
        "id": "event-2",
        "detail-type": "CodePipeline Stage Execution State Change",
        "source": "aws.codepipeline",
        "account": "123456789012",
        "time": "2024-05-01T10:00:05Z",
        "region": "eu-west-1",
        "resources": [],
        "detail": {
            "pipeline": "checkout",
            "version": 4,
            "execution-id": execution_id,
            "stage": stage,
            "state": state
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordedWrite {
    Post(Vec<NotificationFragment>),
    Update {
        ts: String,
        fragments: Vec<NotificationFragment>,
    },
}

/// In-memory transport with a fixed history and a write log.
#[derive(Default)]
pub(crate) struct FakeTransport {
    pub(crate) history: Vec<ChannelMessage>,
    pub(crate) fail_writes: bool,
    pub(crate) writes: Mutex<Vec<RecordedWrite>>,
}

impl FakeTransport {
    pub(crate) fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().expect("writes lock").clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn find_message(
        &self,
        _channel_id: &str,
        predicate: MessagePredicate<'_>,
    ) -> Result<Option<ChannelMessage>> {
        Ok(self.history.iter().find(|message| predicate(message)).cloned())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        fragments: &[NotificationFragment],
    ) -> Result<PostedMessage> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(RecordedWrite::Post(fragments.to_vec()));
        if self.fail_writes {
            bail!("slack chat.postMessage failed: invalid_auth");
        }
        Ok(PostedMessage {
            channel: channel_id.to_string(),
            ts: "200.1".to_string(),
        })
    }

    async fn update_message(
        &self,
        channel_id: &str,
        ts: &str,
        fragments: &[NotificationFragment],
    ) -> Result<PostedMessage> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(RecordedWrite::Update {
                ts: ts.to_string(),
                fragments: fragments.to_vec(),
            });
        if self.fail_writes {
            bail!("slack chat.update failed: invalid_auth");
        }
        Ok(PostedMessage {
            channel: channel_id.to_string(),
            ts: ts.to_string(),
        })
    }
}
