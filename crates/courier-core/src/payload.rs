//! Structured payloads emitted by label scanners.
//!
//! Shipping labels encode a JSON-ish object; only the numeric `id` matters,
//! both for the scan field and for lookups given a pasted label.

use regex::Regex;
use std::sync::OnceLock;

fn id_regex() -> &'static Regex {
    static ID_REGEX: OnceLock<Regex> = OnceLock::new();
    ID_REGEX.get_or_init(|| Regex::new(r#""id"\s*:\s*"?(\d+)"?"#).expect("valid regex"))
}

/// The first `"id": <digits>` value in `text`, quoted or not.
#[must_use]
pub fn extract_id(text: &str) -> Option<&str> {
    id_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
