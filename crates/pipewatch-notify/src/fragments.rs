//! Attachment model and the title-keyed merge applied on message updates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// One rendered notification line, serialized as a Slack message attachment.
pub struct NotificationFragment {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fallback: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    /// Attachment keys this crate does not model (`id`, `fields`, `mrkdwn_in`,
    /// ...), kept so an update re-sends untouched attachments unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message already present in the channel, identified by its `ts`.
pub struct ChannelMessage {
    pub channel: String,
    pub ts: String,
    pub fragments: Vec<NotificationFragment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Handle returned by the transport after a post or update.
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Replaces the first fragment matching `matches` with `fragment`, or appends it.
///
/// Untouched fragments keep their relative order and the input slice is not
/// modified.
pub fn merge_fragment<P>(
    existing: &[NotificationFragment],
    matches: P,
    fragment: NotificationFragment,
) -> Vec<NotificationFragment>
where
    P: Fn(&NotificationFragment) -> bool,
{
    let mut merged = existing.to_vec();
    match merged.iter().position(|candidate| matches(candidate)) {
        Some(index) => merged[index] = fragment,
        None => merged.push(fragment),
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{merge_fragment, NotificationFragment};

    fn fragment(title: &str, text: &str) -> NotificationFragment {
        NotificationFragment {
            title: title.to_string(),
            fallback: format!("{title} {text}"),
            text: text.to_string(),
            color: "good".to_string(),
            footer: None,
            ..NotificationFragment::default()
        }
    }

    fn titles(fragments: &[NotificationFragment]) -> Vec<&str> {
        fragments
            .iter()
            .map(|fragment| fragment.title.as_str())
            .collect()
    }

    #[test]
    fn unit_merge_fragment_replaces_match_in_place() {
        let existing = vec![
            fragment("Pipeline app", "started"),
            fragment("Stage Build", "started"),
            fragment("Stage Deploy", "started"),
        ];
        let replacement = fragment("Stage Build", "succeeded");
        let merged = merge_fragment(
            &existing,
            |candidate| candidate.title == replacement.title,
            replacement.clone(),
        );

        assert_eq!(merged.len(), existing.len());
        assert_eq!(
            titles(&merged),
            vec!["Pipeline app", "Stage Build", "Stage Deploy"]
        );
        assert_eq!(merged[1].text, "succeeded");
        assert_eq!(existing[1].text, "started");
    }

    #[test]
    fn unit_merge_fragment_appends_when_nothing_matches() {
        let existing = vec![fragment("Pipeline app", "started")];
        let merged = merge_fragment(
            &existing,
            |candidate| candidate.title == "Stage Test",
            fragment("Stage Test", "started"),
        );
        assert_eq!(titles(&merged), vec!["Pipeline app", "Stage Test"]);
    }

    #[test]
    fn unit_merge_fragment_into_empty_sequence_yields_single_fragment() {
        let merged = merge_fragment(&[], |_| true, fragment("Pipeline app", "started"));
        assert_eq!(merged, vec![fragment("Pipeline app", "started")]);
    }

    #[test]
    fn regression_merge_fragment_only_replaces_first_duplicate_title() {
        let existing = vec![
            fragment("Stage Build", "one"),
            fragment("Stage Build", "two"),
        ];
        let merged = merge_fragment(
            &existing,
            |candidate| candidate.title == "Stage Build",
            fragment("Stage Build", "three"),
        );
        assert_eq!(merged[0].text, "three");
        assert_eq!(merged[1].text, "two");
    }

    #[test]
    fn regression_merge_fragment_is_deterministic_for_same_inputs() {
        let existing = vec![fragment("Pipeline app", "started")];
        let incoming = fragment("Stage Build", "failed");
        let first = merge_fragment(
            &existing,
            |candidate| candidate.title == incoming.title,
            incoming.clone(),
        );
        let second = merge_fragment(
            &existing,
            |candidate| candidate.title == incoming.title,
            incoming.clone(),
        );
        assert_eq!(first, second);

        let reapplied = merge_fragment(
            &first,
            |candidate| candidate.title == incoming.title,
            incoming.clone(),
        );
        assert_eq!(reapplied, first);
    }

    #[test]
    fn unit_fragment_serializes_without_empty_footer() {
        let value = serde_json::to_value(fragment("Stage Build", "started")).expect("serialize");
        assert!(value.get("footer").is_none());
        assert_eq!(value["title"], "Stage Build");
    }

    #[test]
    fn regression_merge_keeps_unmodelled_keys_on_untouched_fragments() {
        let tracked: NotificationFragment = serde_json::from_value(serde_json::json!({
            "id": 3,
            "title": "Pipeline app",
            "fallback": "Pipeline app STARTED",
            "text": ":building_construction: started",
            "color": "439FE0",
            "footer": "exec-1",
            "fields": [{"title": "Commit", "value": "abc123"}]
        }))
        .expect("deserialize");
        assert_eq!(tracked.footer.as_deref(), Some("exec-1"));
        assert_eq!(tracked.extra.len(), 2);

        let merged = merge_fragment(
            std::slice::from_ref(&tracked),
            |candidate| candidate.title == "Stage Build",
            fragment("Stage Build", "started"),
        );
        let value = serde_json::to_value(&merged[0]).expect("serialize");
        assert_eq!(value["id"], 3);
        assert_eq!(value["fields"][0]["value"], "abc123");
        assert_eq!(value["footer"], "exec-1");
    }
}
