//! HTTP ingress that accepts EventBridge deliveries and dispatches them.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pipewatch_events::{parse_lifecycle_event, EventParseError};
use pipewatch_notify::PipelineNotifier;
use serde_json::json;
use tokio::net::TcpListener;

use crate::ingress_signature::{verify_ingress_signature, SIGNATURE_HEADER};

pub(crate) const EVENTS_ENDPOINT: &str = "/events";
pub(crate) const HEALTH_ENDPOINT: &str = "/healthz";

#[derive(Clone)]
pub(crate) struct EventIngressConfig {
    pub(crate) bind: String,
    pub(crate) notifier: PipelineNotifier,
    pub(crate) secret: Option<String>,
}

pub(crate) struct EventIngressState {
    notifier: PipelineNotifier,
    secret: Option<String>,
}

impl EventIngressState {
    pub(crate) fn new(notifier: PipelineNotifier, secret: Option<String>) -> Self {
        Self {
            notifier,
            secret: secret
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }
}

pub(crate) async fn run_event_ingress_server(config: EventIngressConfig) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --serve-bind '{}'", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind event ingress on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound event ingress address")?;

    println!(
        "pipewatch event ingress listening: endpoint={} addr={} channel={} signed={}",
        EVENTS_ENDPOINT,
        local_addr,
        config.notifier.channel_id(),
        config.secret.is_some()
    );

    let state = Arc::new(EventIngressState::new(config.notifier, config.secret));
    let app = build_event_ingress_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("event ingress server exited unexpectedly")
}

pub(crate) fn build_event_ingress_router(state: Arc<EventIngressState>) -> Router {
    Router::new()
        .route(EVENTS_ENDPOINT, post(handle_event_delivery))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(state)
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_event_delivery(
    State(state): State<Arc<EventIngressState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        if let Err(error) = verify_ingress_signature(&body, signature, secret) {
            tracing::warn!(error = %error, "rejected unsigned or mis-signed event delivery");
            return error_response(StatusCode::UNAUTHORIZED, "invalid_signature", &error);
        }
    }

    let raw = match std::str::from_utf8(&body) {
        Ok(raw) => raw,
        Err(error) => {
            return error_response(StatusCode::BAD_REQUEST, "invalid_event", &error);
        }
    };
    let event = match parse_lifecycle_event(raw) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(error = %error, "rejected codepipeline event");
            return error_response(StatusCode::BAD_REQUEST, parse_error_reason(&error), &error);
        }
    };

    match state.notifier.handle_event(&event).await {
        Ok(outcome) => {
            let message = outcome.message();
            (
                StatusCode::OK,
                Json(json!({
                    "outcome": outcome.as_str(),
                    "kind": event.kind().as_str(),
                    "execution_id": event.execution_id(),
                    "channel": message.map(|message| message.channel.as_str()),
                    "ts": message.map(|message| message.ts.as_str()),
                })),
            )
                .into_response()
        }
        Err(error) => {
            let rendered = format!("{error:#}");
            tracing::warn!(
                execution_id = event.execution_id(),
                error = %rendered,
                "event dispatch failed"
            );
            error_response(StatusCode::BAD_GATEWAY, "transport_failure", &rendered)
        }
    }
}

fn parse_error_reason(error: &EventParseError) -> &'static str {
    match error {
        EventParseError::UnknownState { .. } => "unknown_state",
        EventParseError::UnsupportedDetailType(_) => "unsupported_detail_type",
        EventParseError::InvalidPayload(_)
        | EventParseError::InvalidEnvelope(_)
        | EventParseError::InvalidDetail { .. } => "invalid_event",
    }
}

fn error_response(
    status: StatusCode,
    reason_code: &str,
    error: &dyn std::fmt::Display,
) -> Response {
    (
        status,
        Json(json!({
            "error": error.to_string(),
            "reason_code": reason_code,
        })),
    )
        .into_response()
}
