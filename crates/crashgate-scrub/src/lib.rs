//! Hides sensitive information in events before they are dispatched.

use std::collections::{BTreeMap, HashSet};

use crashgate_core::{Event, ExtraValue};
use serde_json::Value;
use tracing::warn;

/// Replacement for redacted values.
const REDACTED: &str = "*";

/// Produce a redacted copy of `event`, replacing scalar attribute values and
/// tag values under sensitive keys with `"*"`. The stack trace is left
/// untouched. The input is never mutated.
pub fn scrub_event(event: &Event, sensitive_keys: &HashSet<String>) -> Event {
    Event {
        extra: scrub_map(&event.extra, sensitive_keys),
        tags: scrub_tags(&event.tags, sensitive_keys),
        ..event.clone()
    }
}

fn scrub_map(
    data: &BTreeMap<String, ExtraValue>,
    sensitive_keys: &HashSet<String>,
) -> BTreeMap<String, ExtraValue> {
    data.iter()
        .map(|(key, value)| (key.clone(), scrub_value(key, value, sensitive_keys)))
        .collect()
}

fn scrub_value(key: &str, value: &ExtraValue, sensitive_keys: &HashSet<String>) -> ExtraValue {
    match value {
        ExtraValue::Map(map) => ExtraValue::Map(scrub_map(map, sensitive_keys)),
        ExtraValue::MapList(items) => ExtraValue::MapList(
            items
                .iter()
                .map(|item| scrub_map(item, sensitive_keys))
                .collect(),
        ),
        ExtraValue::Scalar(raw) => {
            // Composite shapes outside the closed set (e.g. a sequence of
            // scalars) pass through unscrubbed, even under a sensitive key.
            if sensitive_keys.contains(key) && !raw.is_array() && !raw.is_object() {
                ExtraValue::Scalar(Value::from(REDACTED))
            } else {
                value.clone()
            }
        }
    }
}

fn scrub_tags(tags: &[String], sensitive_keys: &HashSet<String>) -> Vec<String> {
    tags.iter()
        .map(|tag| match tag.split_once(':') {
            Some((key, _)) if sensitive_keys.contains(key) => {
                format!("{}:{}", key, REDACTED)
            }
            Some(_) => tag.clone(),
            None => {
                // Malformed tag: keep it rather than dropping data.
                warn!("Tag without separator passed through unscrubbed: {}", tag);
                tag.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn base_event() -> Event {
        Event {
            id: "foo".to_string(),
            service_id: "bar".to_string(),
            platform: "python".to_string(),
            extra: BTreeMap::new(),
            stack_trace: vec![BTreeMap::from([
                ("error".to_string(), json!("fatal")),
                ("secret".to_string(), json!("public")),
            ])],
            tags: vec![
                "secret:biz".to_string(),
                "password:qux".to_string(),
                "app:foo".to_string(),
            ],
        }
    }

    #[test]
    fn redacts_flat_sensitive_values() {
        let mut event = base_event();
        event.extra = BTreeMap::from([
            ("message".to_string(), ExtraValue::scalar("public info")),
            ("password".to_string(), ExtraValue::scalar("foo")),
            ("secret".to_string(), ExtraValue::scalar("bar")),
        ]);

        let scrubbed = scrub_event(&event, &keys(&["password", "secret"]));

        assert_eq!(
            scrubbed.extra,
            BTreeMap::from([
                ("message".to_string(), ExtraValue::scalar("public info")),
                ("password".to_string(), ExtraValue::scalar(REDACTED)),
                ("secret".to_string(), ExtraValue::scalar(REDACTED)),
            ])
        );
        assert_eq!(
            scrubbed.tags,
            vec!["secret:*", "password:*", "app:foo"]
        );
    }

    #[test]
    fn redacts_nested_maps_and_map_lists() {
        let mut event = base_event();
        event.extra = BTreeMap::from([
            ("message".to_string(), ExtraValue::scalar("public info")),
            (
                "user".to_string(),
                ExtraValue::Map(BTreeMap::from([(
                    "credentials".to_string(),
                    ExtraValue::Map(BTreeMap::from([(
                        "pwd".to_string(),
                        ExtraValue::scalar("foo"),
                    )])),
                )])),
            ),
            (
                "keys".to_string(),
                ExtraValue::MapList(vec![BTreeMap::from([(
                    "secret".to_string(),
                    ExtraValue::scalar("bar"),
                )])]),
            ),
        ]);

        let scrubbed = scrub_event(&event, &keys(&["pwd", "secret"]));

        assert_eq!(
            scrubbed.extra.get("user"),
            Some(&ExtraValue::Map(BTreeMap::from([(
                "credentials".to_string(),
                ExtraValue::Map(BTreeMap::from([(
                    "pwd".to_string(),
                    ExtraValue::scalar(REDACTED),
                )])),
            )])))
        );
        assert_eq!(
            scrubbed.extra.get("keys"),
            Some(&ExtraValue::MapList(vec![BTreeMap::from([(
                "secret".to_string(),
                ExtraValue::scalar(REDACTED),
            )])]))
        );
        // Non-sensitive scalars survive untouched
        assert_eq!(
            scrubbed.extra.get("message"),
            Some(&ExtraValue::scalar("public info"))
        );
    }

    #[test]
    fn sequence_of_scalars_passes_through_under_sensitive_key() {
        let mut event = base_event();
        event.extra = BTreeMap::from([(
            "secret".to_string(),
            ExtraValue::Scalar(json!(["a", "b"])),
        )]);

        let scrubbed = scrub_event(&event, &keys(&["secret"]));

        assert_eq!(
            scrubbed.extra.get("secret"),
            Some(&ExtraValue::Scalar(json!(["a", "b"])))
        );
    }

    #[test]
    fn stack_trace_is_never_scrubbed() {
        let event = base_event();

        let scrubbed = scrub_event(&event, &keys(&["secret", "error"]));

        assert_eq!(scrubbed.stack_trace, event.stack_trace);
    }

    #[test]
    fn tag_without_separator_passes_through() {
        let mut event = base_event();
        event.tags = vec!["password".to_string(), "app:foo".to_string()];

        let scrubbed = scrub_event(&event, &keys(&["password"]));

        assert_eq!(scrubbed.tags, vec!["password", "app:foo"]);
    }

    #[test]
    fn tag_value_with_colons_splits_at_first_colon() {
        let mut event = base_event();
        event.tags = vec!["password:a:b".to_string(), "url:http://x".to_string()];

        let scrubbed = scrub_event(&event, &keys(&["password"]));

        assert_eq!(scrubbed.tags, vec!["password:*", "url:http://x"]);
    }

    #[test]
    fn scrub_is_idempotent() {
        let mut event = base_event();
        event.extra = BTreeMap::from([
            ("password".to_string(), ExtraValue::scalar("foo")),
            (
                "user".to_string(),
                ExtraValue::Map(BTreeMap::from([(
                    "secret".to_string(),
                    ExtraValue::scalar("bar"),
                )])),
            ),
        ]);
        let sensitive = keys(&["password", "secret"]);

        let once = scrub_event(&event, &sensitive);
        let twice = scrub_event(&once, &sensitive);

        assert_eq!(once, twice);
    }

    #[test]
    fn input_event_is_left_intact() {
        let mut event = base_event();
        event.extra =
            BTreeMap::from([("password".to_string(), ExtraValue::scalar("foo"))]);

        let _ = scrub_event(&event, &keys(&["password"]));

        assert_eq!(
            event.extra.get("password"),
            Some(&ExtraValue::scalar("foo"))
        );
        assert_eq!(event.tags[1], "password:qux");
    }
}
