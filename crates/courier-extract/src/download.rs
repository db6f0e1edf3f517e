//! Placing a captured download into the managed download directory.

use crate::error::Result;
use courier_browser::PendingDownload;
use courier_core::Timestamp;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The spreadsheet captured by one successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionArtifact {
    pub path: PathBuf,
    pub suggested_name: Option<String>,
    pub captured_at: Timestamp,
}

/// File name for a download: the suggested name, or `report-<millis>.xlsx`.
///
/// Directory components of the suggestion are dropped.
pub fn artifact_file_name(suggested: Option<&str>, captured_at: &Timestamp) -> String {
    suggested
        .and_then(|name| Path::new(name.trim()).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("report-{}.xlsx", captured_at.timestamp_millis()))
}

/// Move `pending` to its final name inside `dir`.
pub fn finalize_download(pending: PendingDownload, dir: &Path) -> Result<ExtractionArtifact> {
    let captured_at = Timestamp::now();
    let name = artifact_file_name(pending.suggested_filename.as_deref(), &captured_at);
    let path = dir.join(name);

    if pending.path != path {
        fs::rename(&pending.path, &path)?;
    }
    info!("Report downloaded to {}", path.display());

    Ok(ExtractionArtifact {
        path,
        suggested_name: pending.suggested_filename,
        captured_at,
    })
}
