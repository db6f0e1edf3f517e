use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("failed to start processor {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("processor exited with {}", exit_label(*.code))]
    NonZeroExit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("processor did not finish within {0:?}")]
    Timeout(Duration),

    #[error("could not resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

fn exit_label(code: Option<i32>) -> String {
    code.map_or_else(|| "no exit code (terminated by signal)".to_string(), |c| format!("code {c}"))
}

impl HandoffError {
    /// Captured processor output, when the process ran to completion.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            Self::NonZeroExit { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HandoffError>;
