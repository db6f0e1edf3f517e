//! Spreadsheet handling for the Courier report relay.
//!
//! - [`convert`] turns the downloaded workbook into the canonical CSV file
//! - [`reference`] reads and writes the courier reference-data file
//! - [`report`] and [`lookup`] search processed delivery reports

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cell;
pub mod convert;
pub mod error;
pub mod lookup;
pub mod reference;
pub mod report;

pub use convert::{convert_workbook, CanonicalFile, CANONICAL_FILE_NAME};
pub use error::{Result, SheetsError};
pub use lookup::{lookup, search_key, LookupOutcome};
pub use reference::{ReferenceRecord, ReferenceStore, REFERENCE_HEADER};
pub use report::{newest_report, DeliveryRecord, DeliveryReport, UNASSIGNED};
