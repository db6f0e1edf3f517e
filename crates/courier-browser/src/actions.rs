use crate::error::{BrowserError, Result};
use crate::locator::Locator;
use crate::session::StorageState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Interval between polls in the default wait implementations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A file the browser finished writing after a download was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDownload {
    /// Where the browser wrote the bytes
    pub path: PathBuf,
    /// Filename proposed by the server, if any
    pub suggested_filename: Option<String>,
}

/// Browser actions against one browsing surface (tab).
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL and wait for the DOM to load
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL currently shown
    async fn current_url(&self) -> Result<String>;

    /// Number of elements matching the locator
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// Whether the first match is rendered and visible
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Click the `index`-th match
    async fn click_nth(&self, locator: &Locator, index: usize) -> Result<()>;

    /// Replace the value of the first match
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Press a key on the first match, or on the focused element when `None`
    async fn press_key(&self, locator: Option<&Locator>, key: &str) -> Result<()>;

    /// Wait until the document is loaded and network activity is quiet
    async fn wait_for_idle(&self, timeout: Duration) -> Result<()>;

    /// Wait until the URL differs from `from` and the new document has loaded
    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> Result<()>;

    /// Reload the current document
    async fn reload(&self) -> Result<()>;

    /// Full serialized markup
    async fn content(&self) -> Result<String>;

    /// Full-page PNG screenshot
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Cookies and local storage of the current origin
    async fn storage_state(&self) -> Result<StorageState>;

    /// Install cookies and local storage before the next navigation
    async fn restore_storage_state(&self, state: &StorageState) -> Result<()>;

    /// Click `trigger` and wait for the download it starts to finish in `dir`
    async fn capture_download(
        &self,
        trigger: &Locator,
        dir: &Path,
        timeout: Duration,
    ) -> Result<PendingDownload>;

    /// Click the first match
    async fn click(&self, locator: &Locator) -> Result<()> {
        self.click_nth(locator, 0).await
    }

    /// Wait for the first match to become visible
    async fn wait_for_selector(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                if self.is_visible(locator).await.unwrap_or(false) {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BrowserError::Timeout(format!("{locator} not visible after {timeout:?}")))
    }
}

/// Owner of browsing surfaces; able to report surfaces opened by the page.
#[async_trait::async_trait]
pub trait SurfaceHost: Send + Sync {
    /// Identifiers of every open surface
    async fn surface_ids(&self) -> Result<Vec<String>>;

    /// Wait for a surface whose id is not in `known`; `None` on timeout
    async fn wait_for_new_surface(
        &self,
        known: &[String],
        timeout: Duration,
    ) -> Result<Option<Arc<dyn BrowserActions>>>;
}

/// Helper to extract the origin (`scheme://host[:port]`) from a URL
pub fn extract_origin(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    if url.host_str().is_none() {
        return Err(BrowserError::NavigationError("No host in URL".to_string()));
    }
    Ok(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_origin() {
        assert_eq!(
            extract_origin("https://portal.example.com/operations?tab=1").unwrap(),
            "https://portal.example.com"
        );
        assert_eq!(
            extract_origin("http://sub.example.com:8080/path").unwrap(),
            "http://sub.example.com:8080"
        );
    }

    #[test]
    fn test_extract_origin_invalid() {
        assert!(extract_origin("not-a-url").is_err());
        assert!(extract_origin("data:text/plain,hello").is_err());
    }
}
