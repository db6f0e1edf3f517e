//! Best-effort failure evidence: a screenshot and the page markup.

use courier_browser::BrowserActions;
use courier_core::{RunId, Timestamp};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Writes failure captures into one directory.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
    run: Option<RunId>,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            run: None,
        }
    }

    /// Prefix capture names with `run` so they can be matched to its log.
    #[must_use]
    pub fn for_run(mut self, run: &RunId) -> Self {
        self.run = Some(run.clone());
        self
    }

    /// Capture the current state of `page`. Never fails; returns the files
    /// that were written.
    pub async fn capture(&self, page: &dyn BrowserActions, label: &str) -> Vec<PathBuf> {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!("Cannot create diagnostics directory {}: {}", self.dir.display(), e);
            return Vec::new();
        }

        let label = label.replace(|c: char| !c.is_ascii_alphanumeric(), "-");
        let stamp = Timestamp::now().file_stamp();
        let stem = match &self.run {
            Some(run) => format!("failure-{run}-{stamp}-{label}"),
            None => format!("failure-{stamp}-{label}"),
        };
        let mut written = Vec::new();

        match page.screenshot().await {
            Ok(png) => written.extend(self.write(&format!("{stem}.png"), &png)),
            Err(e) => warn!("Failure screenshot not captured: {}", e),
        }
        match page.content().await {
            Ok(html) => written.extend(self.write(&format!("{stem}.html"), html.as_bytes())),
            Err(e) => warn!("Failure markup not captured: {}", e),
        }

        for path in &written {
            info!("Diagnostic saved: {}", path.display());
        }
        written
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Option<PathBuf> {
        let path = self.dir.join(name);
        match fs::write(&path, bytes) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Cannot write {}: {}", path.display(), e);
                None
            }
        }
    }
}
