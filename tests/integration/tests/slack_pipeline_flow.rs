use std::sync::Arc;

use httpmock::prelude::*;
use pipewatch_events::parse_lifecycle_event;
use pipewatch_notify::{DispatchOutcome, PipelineNotifier};
use pipewatch_slack::{SlackApiClient, SlackChatTransport};
use serde_json::{json, Value};

const CHANNEL: &str = "C0PIPELINE";
const EXECUTION_ID: &str = "c6d9a8f2-1234-4cde-9f00-0123456789ab";

fn notifier_for(server: &MockServer) -> PipelineNotifier {
    let client = SlackApiClient::new(server.base_url(), "xoxb-test".to_string(), 2_000, 1, 1)
        .expect("slack client");
    PipelineNotifier::new(Arc::new(SlackChatTransport::new(client, 20)), CHANNEL)
}

fn event(detail_type: &str, detail: Value) -> String {
    json!({
        "version": "0",
        "id": "1b2c3d4e",
        "detail-type": detail_type,
        "source": "aws.codepipeline",
        "account": "123456789012",
        "time": "2024-05-01T10:00:00Z",
        "region": "us-east-1",
        "resources": ["arn:aws:codepipeline:us-east-1:123456789012:web"],
        "detail": detail,
    })
    .to_string()
}

fn tracked_history() -> Value {
    json!({
        "ok": true,
        "messages": [{
            "ts": "1714557600.000200",
            "text": "",
            "attachments": [
                {
                    "id": 1,
                    "title": "Pipeline web",
                    "fallback": "Pipeline web STARTED",
                    "text": ":building_construction: started",
                    "color": "439FE0",
                    "footer": EXECUTION_ID
                },
                {
                    "id": 2,
                    "title": "Stage Build",
                    "fallback": "Stage Build STARTED",
                    "text": ":building_construction: started",
                    "color": "439FE0"
                }
            ]
        }]
    })
}

#[tokio::test]
async fn integration_pipeline_start_posts_new_message_when_history_is_empty() {
    let server = MockServer::start();
    let history = server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.history")
            .query_param("channel", CHANNEL);
        then.status(200).json_body(json!({"ok": true, "messages": []}));
    });
    let post = server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage").json_body_includes(
            json!({
                "channel": CHANNEL,
                "text": "",
                "attachments": [{
                    "title": "Pipeline web",
                    "fallback": "Pipeline web STARTED",
                    "text": ":building_construction: started",
                    "color": "#439FE0",
                    "footer": EXECUTION_ID
                }]
            })
            .to_string(),
        );
        then.status(200).json_body(json!({
            "ok": true,
            "channel": CHANNEL,
            "ts": "1714557600.000200"
        }));
    });
    let update = server.mock(|when, then| {
        when.method(POST).path("/chat.update");
        then.status(200).json_body(json!({"ok": true}));
    });

    let raw = event(
        "CodePipeline Pipeline Execution State Change",
        json!({
            "pipeline": "web",
            "version": 3,
            "state": "STARTED",
            "execution-id": EXECUTION_ID
        }),
    );
    let outcome = notifier_for(&server)
        .handle_event(&parse_lifecycle_event(&raw).expect("parse"))
        .await
        .expect("dispatch");

    assert!(matches!(
        outcome,
        DispatchOutcome::Posted(ref message) if message.ts == "1714557600.000200"
    ));
    history.assert_calls(1);
    post.assert_calls(1);
    update.assert_calls(0);
}

#[tokio::test]
async fn integration_action_failure_rewrites_stage_line_in_tracked_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/conversations.history");
        then.status(200).json_body(tracked_history());
    });
    let update = server.mock(|when, then| {
        when.method(POST).path("/chat.update").json_body_includes(
            json!({
                "channel": CHANNEL,
                "ts": "1714557600.000200",
                "text": "",
                "attachments": [
                    {"title": "Pipeline web", "footer": EXECUTION_ID},
                    {
                        "title": "Stage Build",
                        "text": ":x: failed (CodeBuild)",
                        "color": "danger"
                    }
                ]
            })
            .to_string(),
        );
        then.status(200).json_body(json!({
            "ok": true,
            "channel": CHANNEL,
            "ts": "1714557600.000200"
        }));
    });
    let post = server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage");
        then.status(200).json_body(json!({"ok": true, "ts": "9.9"}));
    });

    let raw = event(
        "CodePipeline Action Execution State Change",
        json!({
            "pipeline": "web",
            "version": 3,
            "execution-id": EXECUTION_ID,
            "stage": "Build",
            "action": "CodeBuild",
            "state": "FAILED",
            "type": {"owner": "AWS", "category": "Build", "provider": "CodeBuild", "version": 1}
        }),
    );
    let outcome = notifier_for(&server)
        .handle_event(&parse_lifecycle_event(&raw).expect("parse"))
        .await
        .expect("dispatch");

    assert_eq!(outcome.as_str(), "updated");
    update.assert_calls(1);
    post.assert_calls(0);
}

#[tokio::test]
async fn integration_stage_event_for_untracked_execution_makes_no_writes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/conversations.history");
        then.status(200).json_body(tracked_history());
    });
    let writes = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({"ok": true, "ts": "1.0"}));
    });

    let raw = event(
        "CodePipeline Stage Execution State Change",
        json!({
            "pipeline": "web",
            "version": 3,
            "execution-id": "another-execution",
            "stage": "Deploy",
            "state": "STARTED"
        }),
    );
    let outcome = notifier_for(&server)
        .handle_event(&parse_lifecycle_event(&raw).expect("parse"))
        .await
        .expect("dispatch");

    assert!(matches!(outcome, DispatchOutcome::Dropped(_)));
    writes.assert_calls(0);
}

#[tokio::test]
async fn integration_slack_rejection_propagates_to_caller() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/conversations.history");
        then.status(200).json_body(json!({"ok": true, "messages": []}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage");
        then.status(200)
            .json_body(json!({"ok": false, "error": "channel_not_found"}));
    });

    let raw = event(
        "CodePipeline Pipeline Execution State Change",
        json!({
            "pipeline": "web",
            "version": 3,
            "state": "SUCCEEDED",
            "execution-id": EXECUTION_ID
        }),
    );
    let error = notifier_for(&server)
        .handle_event(&parse_lifecycle_event(&raw).expect("parse"))
        .await
        .expect_err("slack failure");
    assert!(format!("{error:#}").contains("channel_not_found"));
}
