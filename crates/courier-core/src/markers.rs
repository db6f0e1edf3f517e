//! Fixed textual markers in human-readable output.
//!
//! The invoking layer locates the final report and the full log by scanning
//! free-text output for these markers, so their wording is a contract.

use regex::Regex;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Marker preceding the path of the final processed report.
pub const OUTPUT_MARKER: &str = "output saved at:";

/// Marker preceding the path of the full run log.
pub const LOG_MARKER: &str = "full log saved at:";

/// Render the output marker line for `path`.
pub fn output_line(path: impl Display) -> String {
    format!("{OUTPUT_MARKER} {path}")
}

/// Render the log marker line for `path`.
pub fn log_line(path: impl Display) -> String {
    format!("{LOG_MARKER} {path}")
}

/// Extract the last output path announced in `text`.
#[must_use]
pub fn extract_output_path(text: &str) -> Option<PathBuf> {
    static OUTPUT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = OUTPUT_REGEX
        .get_or_init(|| Regex::new(r"(?m)output saved at:[ \t]*(\S.*?)[ \t]*\r?$").expect("valid regex"));
    last_capture(regex, text)
}

/// Extract the last log path announced in `text`.
#[must_use]
pub fn extract_log_path(text: &str) -> Option<PathBuf> {
    static LOG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = LOG_REGEX
        .get_or_init(|| Regex::new(r"(?m)full log saved at:[ \t]*(\S.*?)[ \t]*\r?$").expect("valid regex"));
    last_capture(regex, text)
}

fn last_capture(regex: &Regex, text: &str) -> Option<PathBuf> {
    regex
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| PathBuf::from(m.as_str()))
}
