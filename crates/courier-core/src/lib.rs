//! Courier Core - Foundation crate for the Courier report relay.
//!
//! This crate provides shared types, error handling, configuration management
//! and the output-marker contract that all other Courier crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`RunId`, `CodeNamespace`, `Timestamp`)
//! - [`markers`] - Fixed output markers parsed by the invoking layer
//! - [`payload`] - `id` extraction from scanned label payloads
//!
//! # Example
//!
//! ```rust
//! use courier_core::{AppConfig, CodeNamespace};
//!
//! let config = AppConfig::default();
//! assert!(config.validate().is_err()); // portal.url is required
//!
//! assert_eq!(CodeNamespace::for_code("br1029"), CodeNamespace::Alternate);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod markers;
pub mod payload;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, ExtractionConfig, PathsConfig, PortalConfig, ProcessorConfig,
    RetryConfig, ScannerConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use payload::extract_id;
pub use types::{CodeNamespace, RunId, Timestamp, ALTERNATE_PREFIX};
