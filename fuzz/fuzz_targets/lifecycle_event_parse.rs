#![no_main]

use libfuzzer_sys::fuzz_target;
use pipewatch_events::{classify, parse_lifecycle_event, EventParseError};
use pipewatch_notify::build_fragment;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    match parse_lifecycle_event(&raw) {
        Ok(event) => {
            let fragment = build_fragment(&event);
            assert_eq!(classify(&event), event.kind());
            assert!(fragment.title.starts_with("Pipeline ") || fragment.title.starts_with("Stage "));
            assert!(!fragment.text.is_empty());
            assert!(!fragment.color.is_empty());
            assert_eq!(
                fragment.footer.is_some(),
                fragment.title.starts_with("Pipeline ")
                    && fragment.footer.as_deref() == Some(event.execution_id())
            );
        }
        Err(EventParseError::UnknownState { value, .. }) => {
            assert!(!matches!(
                value.as_str(),
                "STARTED" | "SUCCEEDED" | "FAILED" | "CANCELED"
            ));
        }
        Err(error) => {
            assert!(!error.to_string().trim().is_empty());
        }
    }
});
