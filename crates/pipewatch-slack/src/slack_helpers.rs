use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Retry budget for one Slack Web API call. A single attempt disables retry.
pub(crate) struct SlackRetryPolicy {
    max_attempts: usize,
    base_delay_ms: u64,
}

impl SlackRetryPolicy {
    pub(crate) fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
        }
    }

    pub(crate) fn allows_another_attempt(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// Wait before attempt `attempt + 1`. Slack's `Retry-After` wins over
    /// exponential backoff but is capped.
    pub(crate) fn delay_after(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        if let Some(retry_after) = retry_after {
            return retry_after.min(MAX_RETRY_AFTER);
        }
        let doublings = (attempt.saturating_sub(1) as u32).min(MAX_BACKOFF_DOUBLINGS);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1_u64 << doublings))
    }
}

/// Slack rate limits (429) and server errors are worth another attempt.
pub(crate) fn is_retryable_slack_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Slack sends `Retry-After` as whole seconds.
pub(crate) fn slack_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

pub(crate) fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Strips a leading `#` and surrounding whitespace from a channel reference.
pub(crate) fn normalize_channel_name(raw: &str) -> &str {
    raw.trim().trim_start_matches('#')
}

/// Slack ids are upper-case alphanumerics starting with C, G or D.
pub(crate) fn looks_like_channel_id(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some('C' | 'G' | 'D'))
        && value.len() >= 9
        && chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
}
