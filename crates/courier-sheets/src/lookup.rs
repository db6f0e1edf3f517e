//! Single-delivery lookup against the newest processed report.

use crate::report::{newest_report, DeliveryRecord, DeliveryReport};
use courier_core::{extract_id, CodeNamespace};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a lookup. Lookups never fail with an error value; problems
/// reading the report are reported as [`LookupOutcome::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found {
        record: DeliveryRecord,
        report: PathBuf,
    },
    NotFound {
        message: String,
    },
    Error {
        message: String,
    },
}

impl LookupOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// The code to search for and the column to search it in.
///
/// `entered` is raw text or a scanned label payload; a payload is reduced to
/// its `id`. Codes starting with `alternate_prefix` (case-insensitive) go to
/// the alternate column, all others to the primary one.
pub fn search_key<'a>(entered: &'a str, alternate_prefix: &str) -> (&'a str, CodeNamespace) {
    let entered = entered.trim();
    let code = extract_id(entered).unwrap_or(entered);
    (
        code,
        CodeNamespace::for_code_with_prefix(code, alternate_prefix),
    )
}

/// Look `code` up in the newest report under `output_dir`.
///
/// See [`search_key`] for how the code is read and routed.
pub fn lookup(output_dir: &Path, code: &str, alternate_prefix: &str) -> LookupOutcome {
    let (code, namespace) = search_key(code, alternate_prefix);
    if code.is_empty() {
        return LookupOutcome::NotFound {
            message: "No code given.".to_string(),
        };
    }

    let report_path = match newest_report(output_dir) {
        Ok(Some(path)) => path,
        Ok(None) => {
            return LookupOutcome::NotFound {
                message: format!(
                    "No delivery report found in {}. Run the automation first.",
                    output_dir.display()
                ),
            }
        }
        Err(e) => {
            warn!("Could not scan {}: {}", output_dir.display(), e);
            return LookupOutcome::Error {
                message: format!("Lookup failed: {e}"),
            };
        }
    };

    debug!(
        "Looking up '{}' in column {} of {}",
        code,
        namespace.column(),
        report_path.display()
    );

    let report = match DeliveryReport::open(&report_path) {
        Ok(report) => report,
        Err(e) => {
            warn!("Could not read {}: {}", report_path.display(), e);
            return LookupOutcome::Error {
                message: format!("Lookup failed: {e}"),
            };
        }
    };

    match report.find(code, namespace) {
        Some(record) => {
            info!("Code '{}' found, assignee {}", code, record.assignee);
            LookupOutcome::Found {
                record,
                report: report_path,
            }
        }
        None => LookupOutcome::NotFound {
            message: format!("Code not found in column {}.", namespace.column()),
        },
    }
}
