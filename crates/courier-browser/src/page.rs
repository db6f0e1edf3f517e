use crate::actions::{extract_origin, BrowserActions, PendingDownload, POLL_INTERVAL};
use crate::error::{BrowserError, Result};
use crate::locator::{js_string, Locator};
use crate::session::{StorageState, StoredCookie};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use courier_core::Timestamp;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const REF_ATTRIBUTE: &str = "data-courier-ref";

/// Quiet period after which the page counts as idle.
const IDLE_QUIET: Duration = Duration::from_millis(500);

const IDLE_PROBE: &str = "(() => ({ \
    ready: document.readyState, \
    resources: performance.getEntriesByType('resource').length \
}))()";

const VISIBLE_BODY: &str = "const e = els[0]; if (!e) return false; \
    const r = e.getBoundingClientRect(); const s = window.getComputedStyle(e); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';";

#[derive(serde::Deserialize)]
struct IdleProbe {
    ready: String,
    resources: usize,
}

/// One browser tab driven through the DevTools protocol.
#[derive(Debug, Clone)]
pub struct BrowserPage {
    page: Page,
}

impl BrowserPage {
    pub(crate) fn new(page: Page) -> Self {
        Self { page }
    }

    /// DevTools target id of this tab.
    pub fn id(&self) -> String {
        self.page.target_id().inner().clone()
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        self.page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    /// Tag the `index`-th match so it can be addressed by a plain selector.
    async fn resolve(&self, locator: &Locator, index: usize) -> Result<Element> {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let body = format!(
            "const e = els[{index}]; if (!e) return null; \
             e.setAttribute({attr}, {tag}); return {tag};",
            attr = js_string(REF_ATTRIBUTE),
            tag = js_string(&tag),
        );

        let tagged: Option<String> = self.eval(locator.script(&body)).await?;
        if tagged.is_none() {
            return Err(BrowserError::SelectorNotFound(locator.to_string()));
        }

        Ok(self
            .page
            .find_element(format!("[{REF_ATTRIBUTE}=\"{tag}\"]"))
            .await?)
    }

    async fn document_ready(&self) -> Result<bool> {
        let probe: IdleProbe = self.eval(IDLE_PROBE.to_string()).await?;
        Ok(probe.ready == "complete")
    }
}

#[async_trait]
impl BrowserActions for BrowserPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.eval(locator.script("return els.length;")).await
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.eval(locator.script(VISIBLE_BODY)).await
    }

    async fn click_nth(&self, locator: &Locator, index: usize) -> Result<()> {
        debug!("Clicking {} (match {})", locator, index);
        self.resolve(locator, index).await?.click().await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.resolve(locator, 0).await?;
        let clear = "const e = els[0]; if (e && 'value' in e) { e.value = ''; \
                     e.dispatchEvent(new Event('input', { bubbles: true })); } return true;";
        let _: bool = self.eval(locator.script(clear)).await?;

        element.focus().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn press_key(&self, locator: Option<&Locator>, key: &str) -> Result<()> {
        let element = match locator {
            Some(locator) => self.resolve(locator, 0).await?,
            None => match self.page.find_element(":focus").await {
                Ok(focused) => focused,
                Err(_) => self.page.find_element("body").await?,
            },
        };
        element.press_key(key).await?;
        Ok(())
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<()> {
        let wait = async {
            let mut last: Option<usize> = None;
            let mut quiet_since = tokio::time::Instant::now();
            loop {
                if let Ok(probe) = self.eval::<IdleProbe>(IDLE_PROBE.to_string()).await {
                    if probe.ready == "complete" {
                        if last != Some(probe.resources) {
                            last = Some(probe.resources);
                            quiet_since = tokio::time::Instant::now();
                        } else if quiet_since.elapsed() >= IDLE_QUIET {
                            return;
                        }
                    } else {
                        last = None;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BrowserError::Timeout(format!("network not idle after {timeout:?}")))
    }

    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                if let Ok(Some(url)) = self.page.url().await {
                    if url != from && self.document_ready().await.unwrap_or(false) {
                        return;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BrowserError::Timeout(format!("still on {from} after {timeout:?}")))
    }

    async fn reload(&self) -> Result<()> {
        self.page.reload().await?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let origin = extract_origin(&self.current_url().await?)?;

        let cookies = self
            .page
            .get_cookies()
            .await?
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: (!c.session).then_some(c.expires),
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        let local_storage: BTreeMap<String, String> = self
            .eval(
                "(() => { const out = {}; \
                 for (let i = 0; i < localStorage.length; i++) { \
                   const k = localStorage.key(i); out[k] = localStorage.getItem(k); } \
                 return out; })()"
                    .to_string(),
            )
            .await?;

        Ok(StorageState {
            origin,
            saved_at: Timestamp::now(),
            cookies,
            local_storage,
        })
    }

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()> {
        let mut params = Vec::with_capacity(state.cookies.len());
        for cookie in &state.cookies {
            let mut builder = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .http_only(cookie.http_only)
                .secure(cookie.secure);
            if let Some(expires) = cookie.expires {
                builder = builder.expires(TimeSinceEpoch::new(expires));
            }
            params.push(builder.build().map_err(BrowserError::ChromiumError)?);
        }
        if !params.is_empty() {
            self.page.set_cookies(params).await?;
        }

        if !state.local_storage.is_empty() {
            let entries = serde_json::to_string(&state.local_storage)?;
            let script = format!(
                "if (location.origin === {origin}) {{ \
                   const entries = {entries}; \
                   for (const [k, v] of Object.entries(entries)) {{ localStorage.setItem(k, v); }} \
                 }}",
                origin = js_string(&state.origin),
            );
            self.page
                .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(script))
                .await?;
        }

        debug!(
            "Restored {} cookies and {} storage entries for {}",
            state.cookies.len(),
            state.local_storage.len(),
            state.origin
        );
        Ok(())
    }

    async fn capture_download(
        &self,
        trigger: &Locator,
        dir: &Path,
        timeout: Duration,
    ) -> Result<PendingDownload> {
        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(BrowserError::Download)?;
        self.page.execute(behavior).await?;

        let mut begins = self.page.event_listener::<EventDownloadWillBegin>().await?;
        let mut progress = self.page.event_listener::<EventDownloadProgress>().await?;

        self.click(trigger).await?;

        let wait = async {
            let begin = begins
                .next()
                .await
                .ok_or_else(|| BrowserError::Download("event stream closed".to_string()))?;
            debug!("Download started: {} ({})", begin.suggested_filename, begin.guid);

            while let Some(event) = progress.next().await {
                if event.guid != begin.guid {
                    continue;
                }
                match event.state {
                    DownloadProgressState::Completed => {
                        let suggested = begin.suggested_filename.trim();
                        return Ok(PendingDownload {
                            path: dir.join(&begin.guid),
                            suggested_filename: (!suggested.is_empty())
                                .then(|| suggested.to_string()),
                        });
                    }
                    DownloadProgressState::Canceled => {
                        return Err(BrowserError::Download(format!(
                            "download {} was canceled",
                            begin.guid
                        )));
                    }
                    DownloadProgressState::InProgress => {}
                }
            }
            Err(BrowserError::Download("event stream closed".to_string()))
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            BrowserError::Timeout(format!("no completed download after {timeout:?}"))
        })?
    }
}
