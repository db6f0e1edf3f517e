//! Tracing setup: console output plus an optional per-run log file.

use anyhow::{Context, Result};
use courier_core::Timestamp;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,courier=debug";

/// Name of the log file for a run started at `at`.
pub fn log_file_name(at: &Timestamp) -> String {
    format!("automation-{}.log", at.file_stamp())
}

/// Install the global subscriber. With `log_dir`, every event is also
/// written to a fresh `automation-<timestamp>.log` whose path is returned.
pub fn init(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let path = dir.join(log_file_name(&Timestamp::now()));
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let name = log_file_name(&Timestamp::now());
        assert!(name.starts_with("automation-"));
        assert!(name.ends_with(".log"));
        assert!(!name.contains(':'));
    }
}
