//! Report extraction for the Courier relay.
//!
//! Drives the portal in a browser from login to a downloaded spreadsheet,
//! converts it to the canonical CSV and hands it to the external processor.
//! Whole attempts are retried under a bounded policy, and [`RunCoordinator`]
//! exposes a run as a progress stream plus one terminal [`RunOutcome`].
//!
//! # Modules
//!
//! - [`login`] - session reuse and credential submission
//! - [`orchestrator`] - the ordered extraction steps
//! - [`strategy`] - priority-ordered fallbacks with one typed failure
//! - [`attempt`] - one attempt end to end
//! - [`retry`] - bounded retry with linear backoff
//! - [`run`] - preparation, progress and the terminal outcome

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod attempt;
pub mod diagnostics;
pub mod download;
pub mod error;
pub mod login;
pub mod orchestrator;
pub mod retry;
pub mod run;
pub mod selectors;
pub mod steps;
pub mod strategy;

pub use attempt::{
    execute_attempt, run_attempt, AttemptContext, AttemptSuccess, ProgressSink,
};
pub use diagnostics::Diagnostics;
pub use download::{artifact_file_name, ExtractionArtifact};
pub use error::{AttemptError, ExtractError, Result, RunInProgress};
pub use login::{ensure_authenticated, LoginOutcome};
pub use orchestrator::{ExtractionOrchestrator, StepObserver, Timings};
pub use retry::{run_with_retry, RetryPolicy, RunReport};
pub use run::{execute_run, prepare_run, RunCoordinator, RunHandle, RunOutcome, RunProgress};
pub use selectors::PortalSelectors;
pub use steps::Step;
pub use strategy::first_success;
