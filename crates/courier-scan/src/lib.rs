//! Lookup-field input classification.
//!
//! Tells barcode-scanner bursts apart from human typing, extracts the `id`
//! of structured label payloads and routes finalized codes to the primary
//! or alternate code column.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod driver;

pub use classifier::{
    ClassifierConfig, ScanClassifier, ScanDecision, ScanEvent, ScanInput, ScanKey, ScanSource,
    ScanTrigger,
};
pub use driver::{spawn, ScanHandle};
