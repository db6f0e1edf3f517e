//! File-path-and-exit-code contract with the external processor.
//!
//! The processor receives `(canonical-file, output-directory,
//! reference-data-file)` as positional arguments. Exit status 0 is success.

use crate::error::{HandoffError, Result};
use crate::invocation::Invocation;
use courier_core::markers::extract_output_path;
use courier_core::ProcessorConfig;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Inputs of one processor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    pub canonical_input: PathBuf,
    pub output_dir: PathBuf,
    pub reference_data: PathBuf,
}

impl HandoffRequest {
    fn args(&self) -> [&Path; 3] {
        [&self.canonical_input, &self.output_dir, &self.reference_data]
    }
}

/// What a successful invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    pub stdout: String,
    pub stderr: String,
    /// Path announced on stdout as `output saved at: <path>`.
    ///
    /// Processors that print no such line (or a localized variant of it)
    /// leave this `None` even when they wrote a report.
    pub output_path: Option<PathBuf>,
}

/// Runs the configured processor.
#[derive(Debug, Clone)]
pub struct ProcessorHandoff {
    invocation: Invocation,
    timeout: Duration,
}

impl ProcessorHandoff {
    pub fn new(invocation: Invocation, timeout: Duration) -> Self {
        Self {
            invocation,
            timeout,
        }
    }

    /// Build from configuration, resolving relative paths against the
    /// current working directory.
    pub fn from_config(config: &ProcessorConfig) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(HandoffError::WorkingDir)?;
        let invocation = Invocation::for_processor(&config.path, &config.interpreter, &cwd);
        Ok(Self::new(
            invocation,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Run the processor once and wait for it to exit.
    pub async fn invoke(&self, request: &HandoffRequest) -> Result<HandoffReport> {
        if !request.reference_data.exists() {
            warn!(
                "Reference data file {} does not exist",
                request.reference_data.display()
            );
        }

        let program = self.invocation.program();
        let mut command = Command::new(&program);
        command
            .args(self.invocation.leading_args())
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!("Running processor: {:?}", self.invocation);
        debug!("Processor arguments: {:?}", request.args());

        let child = command.spawn().map_err(|source| HandoffError::Spawn {
            program: PathBuf::from(&program),
            source,
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| HandoffError::Timeout(self.timeout))?
            .map_err(|source| HandoffError::Spawn {
                program: PathBuf::from(&program),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!(target: "courier::processor", "{}", line);
        }
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            warn!(target: "courier::processor", "{}", line);
        }

        if !output.status.success() {
            return Err(HandoffError::NonZeroExit {
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        let output_path = extract_output_path(&stdout);
        match &output_path {
            Some(path) => info!("Processor finished, output at {}", path.display()),
            None => info!("Processor finished without announcing an output path"),
        }

        Ok(HandoffReport {
            stdout,
            stderr,
            output_path,
        })
    }
}
