use anyhow::{Context, Result};
use courier_core::config::mask;
use courier_core::markers::{log_line, output_line};
use courier_core::AppConfig;
use courier_extract::{RunCoordinator, RunOutcome, RunProgress};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Log where and with what the run is about to happen.
fn banner(config: &AppConfig) {
    info!("Starting Courier v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Platform: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    if let Ok(cwd) = std::env::current_dir() {
        info!("Working directory: {}", cwd.display());
    }
    info!("Target: {}", config.portal.url);
    info!("User: {}", mask(&config.portal.username));
    info!("Headless: {}", config.browser.headless);
    info!("Download directory: {}", config.paths.download_dir.display());
    info!("Output directory: {}", config.paths.output_dir.display());
    info!("Reference data: {}", config.paths.reference_file.display());
    info!("Processor: {}", config.processor.path.display());
}

fn describe(progress: &RunProgress) -> String {
    match progress {
        RunProgress::Preparing => "Preparing run directories".to_string(),
        RunProgress::AttemptStarted {
            attempt,
            max_attempts,
        } => format!("Attempt {attempt}/{max_attempts}"),
        RunProgress::Step(step) => format!("  - {step}"),
        RunProgress::Converting => "Converting report".to_string(),
        RunProgress::Processing => "Running processor".to_string(),
        RunProgress::RetryScheduled {
            failed_attempt,
            delay,
            reason,
        } => format!(
            "Attempt {failed_attempt} failed ({reason}), retrying in {}s",
            delay.as_secs()
        ),
    }
}

pub async fn execute(config: AppConfig, log_path: Option<PathBuf>) -> Result<ExitCode> {
    banner(&config);

    let mut handle = RunCoordinator::new().spawn_run(config)?;
    info!("Run id: {}", handle.run_id);
    while let Some(progress) = handle.progress.recv().await {
        println!("{}", describe(&progress));
    }
    let outcome = handle.outcome.await.context("run task ended without an outcome")?;

    let code = match outcome {
        RunOutcome::Succeeded {
            output_path,
            canonical,
            attempts,
        } => {
            info!("Run succeeded after {} attempt(s)", attempts);
            println!("Processed {}", canonical.display());
            if let Some(path) = output_path {
                println!("{}", output_line(path.display()));
            }
            ExitCode::SUCCESS
        }
        RunOutcome::Failed {
            error,
            stderr,
            attempts,
            diagnostics_dir,
        } => {
            error!("Run failed after {} attempt(s): {}", attempts, error);
            eprintln!("Run failed: {error}");
            if let Some(stderr) = stderr.filter(|s| !s.trim().is_empty()) {
                eprintln!("Processor output:\n{}", stderr.trim_end());
            }
            eprintln!(
                "Diagnostics: {} (captures prefixed failure-{})",
                diagnostics_dir.display(),
                handle.run_id
            );
            ExitCode::FAILURE
        }
    };

    if let Some(path) = log_path {
        println!("{}", log_line(path.display()));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_extract::Step;
    use std::time::Duration;

    #[test]
    fn test_describe_progress() {
        assert_eq!(
            describe(&RunProgress::AttemptStarted {
                attempt: 1,
                max_attempts: 2
            }),
            "Attempt 1/2"
        );
        assert_eq!(
            describe(&RunProgress::Step(Step::LocateDownload)),
            "  - locate download link"
        );
        assert_eq!(
            describe(&RunProgress::RetryScheduled {
                failed_attempt: 1,
                delay: Duration::from_secs(2),
                reason: "download failed".to_string(),
            }),
            "Attempt 1 failed (download failed), retrying in 2s"
        );
    }
}
