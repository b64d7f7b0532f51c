//! EventBridge envelope decoding for CodePipeline state-change events.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::codepipeline_event::{
    ActionExecutionEvent, ActionState, ActionTypeDescriptor, EventEnvelope, EventKind,
    LifecycleEvent, PipelineExecutionEvent, PipelineState, StageExecutionEvent, StageState,
};

#[derive(Debug, Error)]
/// Reasons an inbound payload cannot become a `LifecycleEvent`.
pub enum EventParseError {
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("invalid event envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),
    #[error("unsupported event detail-type '{0}'")]
    UnsupportedDetailType(String),
    #[error("invalid {kind} event detail: {source}")]
    InvalidDetail {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown {kind} state '{value}'")]
    UnknownState { kind: EventKind, value: String },
}

#[derive(Debug, Deserialize)]
struct RawEventEnvelope {
    #[serde(rename = "detail-type")]
    detail_type: String,
    #[serde(default)]
    detail: Value,
    #[serde(flatten)]
    envelope: EventEnvelope,
}

#[derive(Debug, Deserialize)]
struct RawPipelineDetail {
    pipeline: String,
    version: Number,
    #[serde(rename = "execution-id")]
    execution_id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct RawStageDetail {
    pipeline: String,
    version: Number,
    #[serde(rename = "execution-id")]
    execution_id: String,
    stage: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct RawActionDetail {
    pipeline: String,
    version: Number,
    #[serde(rename = "execution-id")]
    execution_id: String,
    stage: String,
    action: String,
    state: String,
    #[serde(default, rename = "type")]
    action_type: Option<ActionTypeDescriptor>,
}

/// Parses a raw EventBridge JSON document into a lifecycle event.
pub fn parse_lifecycle_event(raw: &str) -> Result<LifecycleEvent, EventParseError> {
    let value = serde_json::from_str::<Value>(raw).map_err(EventParseError::InvalidPayload)?;
    lifecycle_event_from_value(value)
}

/// Decodes an already-parsed EventBridge document into a lifecycle event.
pub fn lifecycle_event_from_value(value: Value) -> Result<LifecycleEvent, EventParseError> {
    let raw = serde_json::from_value::<RawEventEnvelope>(value)
        .map_err(EventParseError::InvalidEnvelope)?;
    let kind = EventKind::from_detail_type(raw.detail_type.trim())
        .ok_or_else(|| EventParseError::UnsupportedDetailType(raw.detail_type.clone()))?;

    match kind {
        EventKind::Pipeline => {
            let detail: RawPipelineDetail = decode_detail(kind, raw.detail)?;
            let state = PipelineState::parse(&detail.state)
                .ok_or_else(|| unknown_state(kind, &detail.state))?;
            Ok(LifecycleEvent::Pipeline(PipelineExecutionEvent {
                envelope: raw.envelope,
                pipeline: detail.pipeline,
                version: detail.version,
                execution_id: detail.execution_id,
                state,
            }))
        }
        EventKind::Stage => {
            let detail: RawStageDetail = decode_detail(kind, raw.detail)?;
            let state = StageState::parse(&detail.state)
                .ok_or_else(|| unknown_state(kind, &detail.state))?;
            Ok(LifecycleEvent::Stage(StageExecutionEvent {
                envelope: raw.envelope,
                pipeline: detail.pipeline,
                version: detail.version,
                execution_id: detail.execution_id,
                stage: detail.stage,
                state,
            }))
        }
        EventKind::Action => {
            let detail: RawActionDetail = decode_detail(kind, raw.detail)?;
            let state = ActionState::parse(&detail.state)
                .ok_or_else(|| unknown_state(kind, &detail.state))?;
            Ok(LifecycleEvent::Action(ActionExecutionEvent {
                envelope: raw.envelope,
                pipeline: detail.pipeline,
                version: detail.version,
                execution_id: detail.execution_id,
                stage: detail.stage,
                action: detail.action,
                state,
                action_type: detail.action_type,
            }))
        }
    }
}

fn decode_detail<T: DeserializeOwned>(kind: EventKind, detail: Value) -> Result<T, EventParseError> {
    serde_json::from_value(detail).map_err(|source| EventParseError::InvalidDetail { kind, source })
}

fn unknown_state(kind: EventKind, value: &str) -> EventParseError {
    EventParseError::UnknownState {
        kind,
        value: value.to_string(),
    }
}
