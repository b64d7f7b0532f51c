//! CodePipeline lifecycle event model and classification for pipewatch.
//!
//! Decodes EventBridge `CodePipeline * Execution State Change` envelopes into a
//! typed `LifecycleEvent` union and classifies each event as pipeline-, stage-
//! or action-level for the notification dispatcher.

mod codepipeline_event;
mod event_parse;

pub use codepipeline_event::*;
pub use event_parse::*;
