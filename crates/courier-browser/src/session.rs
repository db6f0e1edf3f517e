//! Persisted authenticated browsing session.
//!
//! The session file holds cookies and local-storage entries for one origin.
//! Only one file is authoritative; `save` replaces it atomically. Reading is
//! forgiving: a missing, unreadable or corrupt file means "no session".

use crate::actions::BrowserActions;
use crate::error::Result;
use crate::locator::Locator;
use async_trait::async_trait;
use courier_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One persisted cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Seconds since epoch; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

/// Cookies and local storage captured from an authenticated surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    /// Origin the state belongs to, e.g. `https://portal.example.com`
    pub origin: String,
    pub saved_at: Timestamp,
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

impl StorageState {
    /// Whether there is anything worth restoring.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty()
    }
}

/// Result of probing the current page for a login surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Authenticated,
    NeedsLogin,
}

/// Predicate deciding whether the current page is a login surface.
#[async_trait]
pub trait LoginMarkerCheck: Send + Sync {
    async fn is_login_surface(&self, page: &dyn BrowserActions) -> Result<bool>;
}

/// Login surface detected by the presence of an element.
#[derive(Debug, Clone)]
pub struct SelectorMarker(pub Locator);

#[async_trait]
impl LoginMarkerCheck for SelectorMarker {
    async fn is_login_surface(&self, page: &dyn BrowserActions) -> Result<bool> {
        Ok(page.count(&self.0).await? > 0)
    }
}

/// File-backed session persistence.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted session, if one is present and readable.
    pub fn load(&self) -> Option<StorageState> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Session file {} unreadable, starting fresh: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => {
                info!("Loaded session from {}", self.path.display());
                Some(state)
            }
            Err(e) => {
                warn!("Session file {} is corrupt, starting fresh: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Load the session only if it belongs to `origin` and holds something
    /// to restore.
    pub fn load_for(&self, origin: &str) -> Option<StorageState> {
        self.load().filter(|state| {
            if state.origin != origin {
                warn!(
                    "Ignoring session for {} (target origin is {})",
                    state.origin, origin
                );
                return false;
            }
            if state.is_empty() {
                debug!("Stored session for {} is empty", origin);
                return false;
            }
            true
        })
    }

    /// Persist `state`, replacing any previous session.
    pub fn save(&self, state: &StorageState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;

        info!("Session saved to {}", self.path.display());
        Ok(())
    }

    /// Ask `check` whether the page currently shows a login surface.
    pub async fn probe(
        page: &dyn BrowserActions,
        check: &dyn LoginMarkerCheck,
    ) -> Result<SessionStatus> {
        if check.is_login_surface(page).await? {
            Ok(SessionStatus::NeedsLogin)
        } else {
            Ok(SessionStatus::Authenticated)
        }
    }
}
