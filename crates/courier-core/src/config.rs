//! Configuration management for Courier.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/courier/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used. The portal URL has no
/// default and must come from the file or `COURIER_SITE_URL`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target portal and credentials
    pub portal: PortalConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Files and directories used by a run
    pub paths: PathsConfig,
    /// External processor invocation
    pub processor: ProcessorConfig,
    /// Attempt retry policy
    pub retry: RetryConfig,
    /// Portal-specific extraction parameters
    pub extraction: ExtractionConfig,
    /// Scan input classifier tuning
    pub scanner: ScannerConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, falling back to defaults if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides, then validate.
    ///
    /// `path` overrides the default config file location.
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    ///
    /// Supports the following variables:
    /// - `COURIER_SITE_URL`, `COURIER_SITE_USER`, `COURIER_SITE_PASSWORD`
    /// - `COURIER_HEADLESS` (true/false), `COURIER_BROWSER_PATH`
    /// - `COURIER_SESSION_FILE`, `COURIER_DOWNLOAD_DIR`, `COURIER_OUTPUT_DIR`,
    ///   `COURIER_REFERENCE_FILE`, `COURIER_LOG_DIR`
    /// - `COURIER_PROCESSOR`, `COURIER_INTERPRETER`
    /// - `COURIER_MAX_ATTEMPTS`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("COURIER_SITE_URL") {
            self.portal.url = val;
            tracing::debug!("Override portal.url from env");
        }
        if let Some(val) = lookup("COURIER_SITE_USER") {
            self.portal.username = val;
        }
        if let Some(val) = lookup("COURIER_SITE_PASSWORD") {
            self.portal.password = val;
        }

        if let Some(val) = lookup("COURIER_HEADLESS") {
            if let Ok(headless) = val.to_ascii_lowercase().parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }
        if let Some(val) = lookup("COURIER_BROWSER_PATH") {
            self.browser.search_path = Some(PathBuf::from(val));
        }

        let path_overrides: [(&str, &mut PathBuf); 5] = [
            ("COURIER_SESSION_FILE", &mut self.paths.session_file),
            ("COURIER_DOWNLOAD_DIR", &mut self.paths.download_dir),
            ("COURIER_OUTPUT_DIR", &mut self.paths.output_dir),
            ("COURIER_REFERENCE_FILE", &mut self.paths.reference_file),
            ("COURIER_LOG_DIR", &mut self.paths.log_dir),
        ];
        for (key, slot) in path_overrides {
            if let Some(val) = lookup(key) {
                *slot = PathBuf::from(val);
                tracing::debug!("Override {} from env: {}", key, slot.display());
            }
        }

        if let Some(val) = lookup("COURIER_PROCESSOR") {
            self.processor.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("COURIER_INTERPRETER") {
            self.processor.interpreter = val;
        }

        if let Some(val) = lookup("COURIER_MAX_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                self.retry.max_attempts = attempts;
                tracing::debug!("Override retry.max_attempts from env: {}", attempts);
            }
        }
    }

    /// Check the values a run cannot start without.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.portal.url.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "portal.url".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/courier/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = project_dirs().ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "courier", "courier")
}

/// Target portal settings.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Page that hosts the report filters (required)
    pub url: String,
    /// Login user name or email
    pub username: String,
    /// Login password (never serialized back to disk)
    #[serde(skip_serializing)]
    pub password: String,
}

impl PortalConfig {
    /// Whether both credential fields are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("url", &self.url)
            .field("username", &mask(&self.username))
            .field("password", &mask(&self.password))
            .finish()
    }
}

/// Render a credential for logs: `***` when set, `(unset)` otherwise.
#[must_use]
pub fn mask(value: &str) -> &'static str {
    if value.is_empty() {
        "(unset)"
    } else {
        "***"
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Explicit Chromium executable
    pub executable: Option<PathBuf>,
    /// Directory searched for a bundled Chromium when `executable` is unset
    pub search_path: Option<PathBuf>,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            search_path: None,
            window_width: 1366,
            window_height: 900,
            navigation_timeout_secs: 30,
        }
    }
}

/// Files and directories used by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Persisted browser session
    pub session_file: PathBuf,
    /// Managed download directory, cleared at the start of every run
    pub download_dir: PathBuf,
    /// Where the processor writes final reports (also searched by lookups)
    pub output_dir: PathBuf,
    /// Operator-maintained reference data
    pub reference_file: PathBuf,
    /// Per-run log files
    pub log_dir: PathBuf,
    /// Screenshots and markup dumps captured on failure
    pub diagnostics_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let output_dir = UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|d| d.join("deliveries")))
            .unwrap_or_else(|| data_dir.join("deliveries"));

        Self {
            session_file: data_dir.join("session.json"),
            download_dir: data_dir.join("downloads"),
            output_dir,
            reference_file: data_dir.join("couriers.csv"),
            log_dir: data_dir.join("logs"),
            diagnostics_dir: data_dir.join("diagnostics"),
        }
    }
}

/// External processor invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Standalone executable or script path
    pub path: PathBuf,
    /// Interpreter used when `path` is a script
    pub interpreter: String,
    /// Upper bound on processor runtime in seconds
    pub timeout_secs: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("processor.py"),
            interpreter: "python".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Attempt retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per run (at least 1)
    pub max_attempts: u32,
    /// Delay after failed attempt `i` is `base_delay_ms * i`
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 2000,
        }
    }
}

/// Portal-specific extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Value chosen in the filter selection widget
    pub filter_value: String,
    /// Visible label of the panel whose export control is used
    pub panel_label: String,
    /// Wait after opening the downloads surface before refreshing it
    pub settle_delay_secs: u64,
    /// Upper bound on "page settled" waits (tolerated on expiry)
    pub idle_timeout_secs: u64,
    /// Upper bound on the new-surface vs navigation race
    pub surface_timeout_secs: u64,
    /// Upper bound on the download event (fatal on expiry)
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            filter_value: "Paraná".to_string(),
            panel_label: "PROMESSA".to_string(),
            settle_delay_secs: 15,
            idle_timeout_secs: 60,
            surface_timeout_secs: 8,
            download_timeout_secs: 60,
        }
    }
}

/// Scan input classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Quiet gap that closes a keystroke burst
    pub burst_gap_ms: u64,
    /// Debounce applied to value changes
    pub debounce_ms: u64,
    /// Window in which identical automatic lookups are suppressed
    pub dedupe_window_ms: u64,
    /// Prefix routing a code to the alternate field
    pub alternate_prefix: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            burst_gap_ms: 50,
            debounce_ms: 100,
            dedupe_window_ms: 1000,
            alternate_prefix: crate::types::ALTERNATE_PREFIX.to_string(),
        }
    }
}
