//! Renders lifecycle events into Slack attachment fragments.

use pipewatch_events::{
    ActionExecutionEvent, ExecutionStatus, LifecycleEvent, PipelineExecutionEvent,
    StageExecutionEvent,
};
use serde_json::Map;

use crate::fragments::NotificationFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Info,
    Success,
    Danger,
    Warning,
}

impl StatusColor {
    /// Slack attachment `color` value.
    pub fn as_slack_str(self) -> &'static str {
        match self {
            Self::Info => "#439FE0",
            Self::Success => "good",
            Self::Danger => "danger",
            Self::Warning => "warning",
        }
    }
}

pub fn status_color(status: ExecutionStatus) -> StatusColor {
    match status {
        ExecutionStatus::Started | ExecutionStatus::Resumed => StatusColor::Info,
        ExecutionStatus::Succeeded => StatusColor::Success,
        ExecutionStatus::Failed | ExecutionStatus::Canceled => StatusColor::Danger,
        ExecutionStatus::Superseded => StatusColor::Warning,
    }
}

pub fn status_phrase(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Started => ":building_construction: started",
        ExecutionStatus::Resumed => ":building_construction: resumed",
        ExecutionStatus::Succeeded => ":white_check_mark: succeeded",
        ExecutionStatus::Failed => ":x: failed",
        ExecutionStatus::Canceled => ":no_entry: cancelled",
        ExecutionStatus::Superseded => ":x: superseded",
    }
}

/// Headline fragment for a run. Its footer carries the execution id that
/// later events use to find the message again.
pub fn pipeline_fragment(event: &PipelineExecutionEvent) -> NotificationFragment {
    let status = event.state.status();
    NotificationFragment {
        title: format!("Pipeline {}", event.pipeline),
        fallback: format!("Pipeline {} {}", event.pipeline, status),
        text: status_phrase(status).to_string(),
        color: status_color(status).as_slack_str().to_string(),
        footer: Some(event.execution_id.clone()),
        extra: Map::new(),
    }
}

pub fn stage_fragment(event: &StageExecutionEvent) -> NotificationFragment {
    let status = event.state.status();
    NotificationFragment {
        title: stage_title(&event.stage),
        fallback: format!("Stage {} {}", event.stage, status),
        text: status_phrase(status).to_string(),
        color: status_color(status).as_slack_str().to_string(),
        footer: None,
        extra: Map::new(),
    }
}

/// Shares the stage title so an action update overwrites its stage line.
pub fn action_fragment(event: &ActionExecutionEvent) -> NotificationFragment {
    let status = event.state.status();
    NotificationFragment {
        title: stage_title(&event.stage),
        fallback: format!("Stage {} {}", event.stage, status),
        text: format!("{} ({})", status_phrase(status), event.action),
        color: status_color(status).as_slack_str().to_string(),
        footer: None,
        extra: Map::new(),
    }
}

pub fn build_fragment(event: &LifecycleEvent) -> NotificationFragment {
    match event {
        LifecycleEvent::Pipeline(event) => pipeline_fragment(event),
        LifecycleEvent::Stage(event) => stage_fragment(event),
        LifecycleEvent::Action(event) => action_fragment(event),
    }
}

fn stage_title(stage: &str) -> String {
    format!("Stage {stage}")
}
