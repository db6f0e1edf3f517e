//! Browser automation engine for the report portal.
//!
//! Drives a Chromium-family browser over the DevTools protocol and persists
//! the authenticated session between runs. Everything above this crate talks
//! to pages through the [`BrowserActions`] and [`SurfaceHost`] traits.

pub mod actions;
pub mod engine;
pub mod error;
pub mod locator;
pub mod page;
pub mod session;

pub use actions::{extract_origin, BrowserActions, PendingDownload, SurfaceHost};
pub use engine::{locate_executable, BrowserEngine, EngineOptions};
pub use error::{BrowserError, Result};
pub use locator::Locator;
pub use page::BrowserPage;
pub use session::{
    LoginMarkerCheck, SelectorMarker, SessionStatus, SessionStore, StorageState, StoredCookie,
};
