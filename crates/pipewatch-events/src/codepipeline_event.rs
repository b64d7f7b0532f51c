//! Typed CodePipeline lifecycle events and the kind classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

pub const PIPELINE_EXECUTION_DETAIL_TYPE: &str = "CodePipeline Pipeline Execution State Change";
pub const STAGE_EXECUTION_DETAIL_TYPE: &str = "CodePipeline Stage Execution State Change";
pub const ACTION_EXECUTION_DETAIL_TYPE: &str = "CodePipeline Action Execution State Change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Level of a lifecycle event within a pipeline execution.
pub enum EventKind {
    Pipeline,
    Stage,
    Action,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Stage => "stage",
            Self::Action => "action",
        }
    }

    /// EventBridge `detail-type` value that carries this kind.
    pub fn detail_type(self) -> &'static str {
        match self {
            Self::Pipeline => PIPELINE_EXECUTION_DETAIL_TYPE,
            Self::Stage => STAGE_EXECUTION_DETAIL_TYPE,
            Self::Action => ACTION_EXECUTION_DETAIL_TYPE,
        }
    }

    pub fn from_detail_type(detail_type: &str) -> Option<Self> {
        match detail_type {
            PIPELINE_EXECUTION_DETAIL_TYPE => Some(Self::Pipeline),
            STAGE_EXECUTION_DETAIL_TYPE => Some(Self::Stage),
            ACTION_EXECUTION_DETAIL_TYPE => Some(Self::Action),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Union of every state name used across pipeline, stage and action events.
///
/// Presentation keys colors and phrases off this type so that the same literal
/// state renders identically at every level.
pub enum ExecutionStatus {
    Started,
    Succeeded,
    Resumed,
    Failed,
    Canceled,
    Superseded,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Succeeded => "SUCCEEDED",
            Self::Resumed => "RESUMED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Superseded => "SUPERSEDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STARTED" => Some(Self::Started),
            "SUCCEEDED" => Some(Self::Succeeded),
            "RESUMED" => Some(Self::Resumed),
            "FAILED" => Some(Self::Failed),
            "CANCELED" => Some(Self::Canceled),
            "SUPERSEDED" => Some(Self::Superseded),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Started,
    Succeeded,
    Resumed,
    Failed,
    Canceled,
    Superseded,
}

impl PipelineState {
    pub fn parse(value: &str) -> Option<Self> {
        match ExecutionStatus::parse(value)? {
            ExecutionStatus::Started => Some(Self::Started),
            ExecutionStatus::Succeeded => Some(Self::Succeeded),
            ExecutionStatus::Resumed => Some(Self::Resumed),
            ExecutionStatus::Failed => Some(Self::Failed),
            ExecutionStatus::Canceled => Some(Self::Canceled),
            ExecutionStatus::Superseded => Some(Self::Superseded),
        }
    }

    pub fn status(self) -> ExecutionStatus {
        match self {
            Self::Started => ExecutionStatus::Started,
            Self::Succeeded => ExecutionStatus::Succeeded,
            Self::Resumed => ExecutionStatus::Resumed,
            Self::Failed => ExecutionStatus::Failed,
            Self::Canceled => ExecutionStatus::Canceled,
            Self::Superseded => ExecutionStatus::Superseded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Started,
    Succeeded,
    Resumed,
    Failed,
    Canceled,
}

impl StageState {
    /// Stages are never superseded; that value is rejected here.
    pub fn parse(value: &str) -> Option<Self> {
        match ExecutionStatus::parse(value)? {
            ExecutionStatus::Started => Some(Self::Started),
            ExecutionStatus::Succeeded => Some(Self::Succeeded),
            ExecutionStatus::Resumed => Some(Self::Resumed),
            ExecutionStatus::Failed => Some(Self::Failed),
            ExecutionStatus::Canceled => Some(Self::Canceled),
            ExecutionStatus::Superseded => None,
        }
    }

    pub fn status(self) -> ExecutionStatus {
        match self {
            Self::Started => ExecutionStatus::Started,
            Self::Succeeded => ExecutionStatus::Succeeded,
            Self::Resumed => ExecutionStatus::Resumed,
            Self::Failed => ExecutionStatus::Failed,
            Self::Canceled => ExecutionStatus::Canceled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Started,
    Succeeded,
    Failed,
    Canceled,
}

impl ActionState {
    pub fn parse(value: &str) -> Option<Self> {
        match ExecutionStatus::parse(value)? {
            ExecutionStatus::Started => Some(Self::Started),
            ExecutionStatus::Succeeded => Some(Self::Succeeded),
            ExecutionStatus::Failed => Some(Self::Failed),
            ExecutionStatus::Canceled => Some(Self::Canceled),
            ExecutionStatus::Resumed | ExecutionStatus::Superseded => None,
        }
    }

    pub fn status(self) -> ExecutionStatus {
        match self {
            Self::Started => ExecutionStatus::Started,
            Self::Succeeded => ExecutionStatus::Succeeded,
            Self::Failed => ExecutionStatus::Failed,
            Self::Canceled => ExecutionStatus::Canceled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// EventBridge envelope metadata. Carried for logging, never rendered.
///
/// Every field decodes leniently: a malformed value degrades to its default
/// instead of rejecting an event whose `detail` is valid.
pub struct EventEnvelope {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub account: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub region: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub resources: Vec<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => value,
        Value::Number(value) => value.to_string(),
        Value::Bool(value) => value.to_string(),
        _ => String::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::String(raw) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc)))
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(values) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(value) => Some(value),
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineExecutionEvent {
    pub envelope: EventEnvelope,
    pub pipeline: String,
    pub version: Number,
    pub execution_id: String,
    pub state: PipelineState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageExecutionEvent {
    pub envelope: EventEnvelope,
    pub pipeline: String,
    pub version: Number,
    pub execution_id: String,
    pub stage: String,
    pub state: StageState,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Provider descriptor attached to action events (`detail.type`).
pub struct ActionTypeDescriptor {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub version: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionExecutionEvent {
    pub envelope: EventEnvelope,
    pub pipeline: String,
    pub version: Number,
    pub execution_id: String,
    pub stage: String,
    pub action: String,
    pub state: ActionState,
    pub action_type: Option<ActionTypeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single CodePipeline state change, consumed once by the dispatcher.
pub enum LifecycleEvent {
    Pipeline(PipelineExecutionEvent),
    Stage(StageExecutionEvent),
    Action(ActionExecutionEvent),
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        classify(self)
    }

    /// Correlates every event emitted for one pipeline run.
    pub fn execution_id(&self) -> &str {
        match self {
            Self::Pipeline(event) => &event.execution_id,
            Self::Stage(event) => &event.execution_id,
            Self::Action(event) => &event.execution_id,
        }
    }

    pub fn pipeline(&self) -> &str {
        match self {
            Self::Pipeline(event) => &event.pipeline,
            Self::Stage(event) => &event.pipeline,
            Self::Action(event) => &event.pipeline,
        }
    }

    pub fn envelope(&self) -> &EventEnvelope {
        match self {
            Self::Pipeline(event) => &event.envelope,
            Self::Stage(event) => &event.envelope,
            Self::Action(event) => &event.envelope,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Pipeline(event) => event.state.status(),
            Self::Stage(event) => event.state.status(),
            Self::Action(event) => event.state.status(),
        }
    }
}

/// Returns the level of `event`.
pub fn classify(event: &LifecycleEvent) -> EventKind {
    match event {
        LifecycleEvent::Pipeline(_) => EventKind::Pipeline,
        LifecycleEvent::Stage(_) => EventKind::Stage,
        LifecycleEvent::Action(_) => EventKind::Action,
    }
}
