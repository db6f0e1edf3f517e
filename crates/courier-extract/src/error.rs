use crate::steps::Step;
use courier_browser::BrowserError;
use courier_handoff::HandoffError;
use courier_sheets::SheetsError;
use thiserror::Error;

/// Failure of the browser-driven part of an attempt.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no strategy succeeded for step '{step}' (tried: {})", tried.join(", "))]
    NoStrategySucceeded { step: Step, tried: Vec<String> },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Failure of one full attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] SheetsError),

    #[error("processor failed: {0}")]
    Processor(#[from] HandoffError),
}

impl AttemptError {
    /// Whether retrying cannot help: the same input would fail again.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, Self::Conversion(_) | Self::Processor(_))
    }

    /// Processor stderr, when the processor ran and failed.
    pub fn processor_stderr(&self) -> Option<&str> {
        match self {
            Self::Processor(e) => e.captured_output().map(|(_, stderr)| stderr),
            _ => None,
        }
    }
}

/// A run was requested while another one is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a run is already in progress")]
pub struct RunInProgress;
