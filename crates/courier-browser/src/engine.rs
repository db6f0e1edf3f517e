use crate::actions::{BrowserActions, SurfaceHost, POLL_INTERVAL};
use crate::error::{BrowserError, Result};
use crate::page::BrowserPage;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use futures_util::stream::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Executable names probed inside a bundled browser directory.
const EXECUTABLE_NAMES: &[&str] = &[
    "chrome.exe",
    "msedge.exe",
    "chrome",
    "chromium",
    "chromium-browser",
    "google-chrome",
    "headless_shell",
];

/// Launch options for [`BrowserEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub window: (u32, u32),
    pub request_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&courier_core::BrowserConfig::default())
    }
}

impl From<&courier_core::BrowserConfig> for EngineOptions {
    fn from(config: &courier_core::BrowserConfig) -> Self {
        let executable = config.executable.clone().or_else(|| {
            config
                .search_path
                .as_deref()
                .and_then(locate_executable)
        });

        Self {
            headless: config.headless,
            executable,
            window: (config.window_width, config.window_height),
            request_timeout: Duration::from_secs(config.navigation_timeout_secs),
        }
    }
}

/// Find a browser executable in `dir` or one level below it.
pub fn locate_executable(dir: &Path) -> Option<PathBuf> {
    let direct = EXECUTABLE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file());
    if direct.is_some() {
        return direct;
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    subdirs.iter().find_map(|sub| {
        EXECUTABLE_NAMES
            .iter()
            .map(|name| sub.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Browser automation engine
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserEngine {
    /// Launch a browser process with the given options
    pub async fn launch(options: &EngineOptions) -> Result<Self> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(options.window.0, options.window.1)
            .request_timeout(options.request_timeout);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.executable {
            info!("Using browser executable {}", executable.display());
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        info!(headless = options.headless, "Browser launched");
        Ok(Self { browser, handler })
    }

    /// Open a fresh blank tab
    pub async fn new_surface(&self) -> Result<Arc<BrowserPage>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Arc::new(BrowserPage::new(page)))
    }

    /// Shut the browser down and wait for the process to exit
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        info!("Browser closed");
    }
}

#[async_trait]
impl SurfaceHost for BrowserEngine {
    async fn surface_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .browser
            .pages()
            .await?
            .iter()
            .map(|page| page.target_id().inner().clone())
            .collect())
    }

    async fn wait_for_new_surface(
        &self,
        known: &[String],
        timeout: Duration,
    ) -> Result<Option<Arc<dyn BrowserActions>>> {
        let wait = async {
            loop {
                if let Ok(pages) = self.browser.pages().await {
                    if let Some(page) = pages
                        .into_iter()
                        .find(|page| !known.contains(page.target_id().inner()))
                    {
                        return page;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(page) => {
                debug!("New surface opened: {}", page.target_id().inner());
                Ok(Some(Arc::new(BrowserPage::new(page))))
            }
            Err(_) => Ok(None),
        }
    }
}
