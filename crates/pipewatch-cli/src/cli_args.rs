use std::path::PathBuf;

use clap::{ArgGroup, Parser};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "pipewatch",
    about = "Relay AWS CodePipeline state changes into a Slack channel",
    version
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["event_file", "serve_bind"])
))]
pub struct Cli {
    #[arg(
        long = "slack-bot-token",
        env = "PIPEWATCH_SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_bot_token: String,

    #[arg(
        long = "slack-channel",
        env = "PIPEWATCH_SLACK_CHANNEL",
        help = "Channel id (C...) or name (#deploys) that receives pipeline notifications"
    )]
    pub slack_channel: String,

    #[arg(
        long = "slack-api-base",
        env = "PIPEWATCH_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-history-limit",
        env = "PIPEWATCH_SLACK_HISTORY_LIMIT",
        default_value_t = 20,
        value_parser = parse_positive_usize,
        help = "Number of recent channel messages searched for an execution's notification"
    )]
    pub slack_history_limit: usize,

    #[arg(
        long = "slack-request-timeout-ms",
        env = "PIPEWATCH_SLACK_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout in milliseconds for each slack api request"
    )]
    pub slack_request_timeout_ms: u64,

    #[arg(
        long = "slack-retry-max-attempts",
        env = "PIPEWATCH_SLACK_RETRY_MAX_ATTEMPTS",
        default_value_t = 1,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for retryable slack api failures (429/5xx/transport); 1 disables retries"
    )]
    pub slack_retry_max_attempts: usize,

    #[arg(
        long = "slack-retry-base-delay-ms",
        env = "PIPEWATCH_SLACK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay in milliseconds for slack api retries"
    )]
    pub slack_retry_base_delay_ms: u64,

    #[arg(
        long = "event-file",
        env = "PIPEWATCH_EVENT_FILE",
        help = "Dispatch a single EventBridge event read from this path ('-' reads stdin) and exit"
    )]
    pub event_file: Option<PathBuf>,

    #[arg(
        long = "serve-bind",
        env = "PIPEWATCH_SERVE_BIND",
        help = "Serve the HTTP event ingress (POST /events) on this address, e.g. 127.0.0.1:8787"
    )]
    pub serve_bind: Option<String>,

    #[arg(
        long = "ingress-secret",
        env = "PIPEWATCH_INGRESS_SECRET",
        hide_env_values = true,
        requires = "serve_bind",
        help = "Shared secret; when set, ingress requests must carry x-pipewatch-signature: sha256=<hex>"
    )]
    pub ingress_secret: Option<String>,
}

impl Cli {
    /// True when `--event-file -` asks for the event on stdin.
    pub fn event_from_stdin(&self) -> bool {
        self.event_file
            .as_deref()
            .is_some_and(|path| path.as_os_str() == "-")
    }
}
