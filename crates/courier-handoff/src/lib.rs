//! Handoff of the canonical delivery file to the external processor.
//!
//! The processor is a black box: it receives three paths, merges deliveries
//! with the reference data and writes its report into the output directory.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod handoff;
pub mod invocation;

pub use error::{HandoffError, Result};
pub use handoff::{HandoffReport, HandoffRequest, ProcessorHandoff};
pub use invocation::Invocation;
