//! The run boundary: one request in, progress out, one terminal outcome.

use crate::attempt::{run_attempt, AttemptContext, AttemptSuccess, ProgressSink};
use crate::error::{AttemptError, RunInProgress};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::steps::Step;
use courier_core::{AppConfig, PathsConfig, RunId};
use courier_sheets::ReferenceStore;
use std::fs;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, info_span, warn, Instrument};

/// Progress notification emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunProgress {
    /// Run directories are being prepared
    Preparing,
    AttemptStarted { attempt: u32, max_attempts: u32 },
    /// A workflow step started
    Step(Step),
    /// The downloaded report is being converted
    Converting,
    /// The processor is running
    Processing,
    RetryScheduled {
        failed_attempt: u32,
        delay: Duration,
        reason: String,
    },
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded {
        /// Final report announced by the processor
        output_path: Option<PathBuf>,
        /// Canonical file handed to the processor
        canonical: PathBuf,
        attempts: u32,
    },
    Failed {
        error: String,
        /// Processor stderr, when the processor was what failed
        stderr: Option<String>,
        attempts: u32,
        /// Where failure screenshots and markup dumps were written
        diagnostics_dir: PathBuf,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Receiving side of a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: RunId,
    pub progress: mpsc::UnboundedReceiver<RunProgress>,
    pub outcome: oneshot::Receiver<RunOutcome>,
}

/// Clear the download directory and make sure the output directory and
/// reference-data file exist.
pub fn prepare_run(paths: &PathsConfig) -> io::Result<()> {
    match fs::remove_dir_all(&paths.download_dir) {
        Ok(()) => info!("Cleared download directory {}", paths.download_dir.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(&paths.download_dir)?;
    fs::create_dir_all(&paths.output_dir)?;

    let reference = ReferenceStore::new(&paths.reference_file);
    if let Err(e) = reference.ensure_exists() {
        warn!("Reference data file not available: {}", e);
    }
    Ok(())
}

/// Prepare, then run `attempt` under the configured retry policy.
///
/// Every notification goes to `progress`; the returned outcome is final.
pub async fn execute_run<F, Fut>(
    config: &AppConfig,
    progress: ProgressSink<'_>,
    mut attempt: F,
) -> RunOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<AttemptSuccess, AttemptError>>,
{
    let diagnostics_dir = config.paths.diagnostics_dir.clone();
    let failed = |error: String, stderr: Option<String>, attempts: u32| RunOutcome::Failed {
        error,
        stderr,
        attempts,
        diagnostics_dir: diagnostics_dir.clone(),
    };

    progress(RunProgress::Preparing);
    if let Err(e) = prepare_run(&config.paths) {
        error!("Run preparation failed: {}", e);
        return failed(format!("could not prepare run directories: {e}"), None, 0);
    }

    let policy = RetryPolicy::from(&config.retry);
    let report = run_with_retry(
        policy,
        |n| {
            progress(RunProgress::AttemptStarted {
                attempt: n,
                max_attempts: policy.max_attempts,
            });
            attempt(n)
        },
        |n, delay, e| {
            progress(RunProgress::RetryScheduled {
                failed_attempt: n,
                delay,
                reason: e.to_string(),
            });
        },
    )
    .await;

    match report.result {
        Ok(success) => {
            if let Some(path) = &success.handoff.output_path {
                info!("Run finished, report at {}", path.display());
            } else {
                info!("Run finished, processor did not announce an output path");
            }
            RunOutcome::Succeeded {
                output_path: success.handoff.output_path,
                canonical: success.canonical.path,
                attempts: report.attempts,
            }
        }
        Err(e) => failed(
            e.to_string(),
            e.processor_stderr().map(str::to_string),
            report.attempts,
        ),
    }
}

/// Starts runs, allowing one in flight at a time.
#[derive(Debug, Clone, Default)]
pub struct RunCoordinator {
    in_flight: Arc<AtomicBool>,
}

impl RunCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Spawn a browser-driven run on the current runtime.
    pub fn spawn_run(&self, config: AppConfig) -> Result<RunHandle, RunInProgress> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RunInProgress);
        }

        let run_id = RunId::generate();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let guard = InFlight(Arc::clone(&self.in_flight));
        let span = info_span!("run", id = %run_id);
        let task_run_id = run_id.clone();

        tokio::spawn(async move {
            let sink = move |update: RunProgress| {
                let _ = progress_tx.send(update);
            };
            info!("Run started");
            let outcome = match AttemptContext::from_config(&config, &task_run_id) {
                Ok(ctx) => execute_run(&config, &sink, |_| run_attempt(&ctx, &sink)).await,
                Err(e) => {
                    error!("Run setup failed: {}", e);
                    RunOutcome::Failed {
                        error: e.to_string(),
                        stderr: None,
                        attempts: 0,
                        diagnostics_dir: config.paths.diagnostics_dir.clone(),
                    }
                }
            };
            drop(guard);
            if outcome_tx.send(outcome).is_err() {
                warn!("Run outcome dropped, nobody is waiting for it");
            }
        }
        .instrument(span));

        Ok(RunHandle {
            run_id,
            progress: progress_rx,
            outcome: outcome_rx,
        })
    }
}

/// Clears the in-flight flag when the run task ends, even by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
