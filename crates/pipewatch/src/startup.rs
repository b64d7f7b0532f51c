//! Process wiring: build the Slack-backed notifier and run the selected mode.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pipewatch_cli::Cli;
use pipewatch_events::{parse_lifecycle_event, LifecycleEvent};
use pipewatch_notify::{DispatchOutcome, PipelineNotifier};
use pipewatch_slack::{SlackApiClient, SlackChatTransport};
use tokio::io::AsyncReadExt;

use crate::event_ingress::{run_event_ingress_server, EventIngressConfig};

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    if let Some(bind) = cli.serve_bind.clone() {
        let notifier = build_notifier(&cli).await?;
        return run_event_ingress_server(EventIngressConfig {
            bind,
            notifier,
            secret: cli.ingress_secret.clone(),
        })
        .await;
    }

    let Some(path) = cli.event_file.as_deref() else {
        bail!("either --event-file or --serve-bind is required");
    };
    let raw = if cli.event_from_stdin() {
        read_event_from_stdin().await?
    } else {
        read_event_file(path).await?
    };
    // Event errors must surface before any Slack call.
    let event = parse_raw_event(&raw)?;
    let notifier = build_notifier(&cli).await?;
    let outcome = notifier.handle_event(&event).await?;
    println!("{}", render_dispatch_report(&outcome));
    Ok(())
}

async fn build_notifier(cli: &Cli) -> Result<PipelineNotifier> {
    let client = SlackApiClient::new(
        cli.slack_api_base.clone(),
        cli.slack_bot_token.clone(),
        cli.slack_request_timeout_ms,
        cli.slack_retry_max_attempts,
        cli.slack_retry_base_delay_ms,
    )?;
    let channel = client
        .resolve_channel(&cli.slack_channel)
        .await
        .with_context(|| format!("failed to resolve slack channel '{}'", cli.slack_channel))?;
    tracing::info!(channel = %channel.id, name = %channel.name, "notifications target channel");

    let transport = Arc::new(SlackChatTransport::new(client, cli.slack_history_limit));
    Ok(PipelineNotifier::new(transport, channel.id))
}

async fn read_event_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read event file {}", path.display()))
}

async fn read_event_from_stdin() -> Result<String> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("failed to read event from stdin")?;
    Ok(raw)
}

pub(crate) fn parse_raw_event(raw: &str) -> Result<LifecycleEvent> {
    let event = parse_lifecycle_event(raw).context("failed to parse codepipeline event")?;
    tracing::debug!(
        execution_id = event.execution_id(),
        pipeline = event.pipeline(),
        kind = event.kind().as_str(),
        status = event.status().as_str(),
        event_id = %event.envelope().id,
        "received codepipeline event"
    );
    Ok(event)
}

pub(crate) fn render_dispatch_report(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Posted(message) | DispatchOutcome::Updated(message) => format!(
            "pipewatch dispatch: outcome={} channel={} ts={}",
            outcome.as_str(),
            message.channel,
            message.ts
        ),
        DispatchOutcome::Dropped(kind) => format!(
            "pipewatch dispatch: outcome={} kind={} reason=no_pipeline_message",
            outcome.as_str(),
            kind
        ),
    }
}
