//! Shared types used across the Courier workspace.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a code as belonging to the alternate namespace.
pub const ALTERNATE_PREFIX: &str = "BR";

/// Newtype for run identifiers.
///
/// Every run request gets a fresh UUID v4. It names the run's tracing span
/// and prefixes its failure captures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a new random `RunId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which search field a finalized code is routed to.
///
/// Processed reports carry two code columns; codes are routed by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeNamespace {
    /// Primary code column (`CODIGO1`)
    Primary,
    /// Alternate code column (`CODIGO2`)
    Alternate,
}

impl CodeNamespace {
    /// Route a code using the default alternate prefix.
    #[must_use]
    pub fn for_code(code: &str) -> Self {
        Self::for_code_with_prefix(code, ALTERNATE_PREFIX)
    }

    /// Route a code: a case-insensitive `prefix` match selects `Alternate`.
    #[must_use]
    pub fn for_code_with_prefix(code: &str, prefix: &str) -> Self {
        let code = code.trim();
        let matches = !prefix.is_empty()
            && code
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));

        if matches {
            Self::Alternate
        } else {
            Self::Primary
        }
    }

    /// Column name used for this namespace in processed reports.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Self::Primary => "CODIGO1",
            Self::Alternate => "CODIGO2",
        }
    }
}

impl fmt::Display for CodeNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Alternate => write!(f, "alternate"),
        }
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Milliseconds since Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Filesystem-safe rendering, e.g. `2026-10-17T09-30-00-123Z`.
    #[must_use]
    pub fn file_stamp(&self) -> String {
        self.0.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
