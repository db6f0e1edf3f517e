//! Scripted browser surfaces for driving the workflow without Chromium.
//!
//! Elements are keyed by the `Display` form of their [`Locator`]. Clicking an
//! element can change which elements are present, which is enough to model
//! dialogs opening and login forms going away.

#![allow(dead_code)]

use async_trait::async_trait;
use courier_browser::{
    BrowserActions, BrowserError, Locator, PendingDownload, Result, StorageState, SurfaceHost,
};
use courier_core::Timestamp;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Change applied to the page when an element is clicked.
#[derive(Debug, Clone)]
pub enum Effect {
    Show(Locator, usize),
    Hide(Locator),
    Navigate(String),
}

#[derive(Default)]
struct FakeState {
    url: String,
    counts: HashMap<String, usize>,
    effects: HashMap<String, Vec<Effect>>,
    download: Option<(Option<String>, Vec<u8>)>,
    reload_fails: bool,
    failing_clicks: HashSet<String>,
    log: Vec<String>,
}

impl FakeState {
    fn count(&self, locator: &Locator) -> usize {
        self.counts.get(&locator.to_string()).copied().unwrap_or(0)
    }

    fn apply(&mut self, key: &str) {
        let effects = self.effects.get(key).cloned().unwrap_or_default();
        for effect in effects {
            match effect {
                Effect::Show(locator, n) => {
                    self.counts.insert(locator.to_string(), n);
                }
                Effect::Hide(locator) => {
                    self.counts.remove(&locator.to_string());
                }
                Effect::Navigate(url) => self.url = url,
            }
        }
    }
}

/// A browsing surface whose DOM is a set of counted locators.
#[derive(Default)]
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        let page = Self::default();
        page.state.lock().unwrap().url = url.to_string();
        page
    }

    /// Make `locator` match `count` visible elements.
    pub fn with(self, locator: &Locator, count: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .counts
            .insert(locator.to_string(), count);
        self
    }

    /// Apply `effect` whenever the first match of `locator` is clicked.
    pub fn on_click(self, locator: &Locator, effect: Effect) -> Self {
        self.on_click_nth(locator, 0, effect)
    }

    /// Apply `effect` whenever the `index`-th match of `locator` is clicked.
    pub fn on_click_nth(self, locator: &Locator, index: usize, effect: Effect) -> Self {
        self.state
            .lock()
            .unwrap()
            .effects
            .entry(format!("{locator}#{index}"))
            .or_default()
            .push(effect);
        self
    }

    /// Serve `bytes` as the download started by any link.
    pub fn with_download(self, suggested: Option<&str>, bytes: &[u8]) -> Self {
        self.state.lock().unwrap().download = Some((suggested.map(str::to_string), bytes.to_vec()));
        self
    }

    /// Make clicks on the `index`-th match of `locator` report an error
    /// after their effects were applied.
    pub fn failing_click_nth(self, locator: &Locator, index: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_clicks
            .insert(format!("{locator}#{index}"));
        self
    }

    /// Make every reload report an error.
    pub fn failing_reload(self) -> Self {
        self.state.lock().unwrap().reload_fails = true;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn logged(&self, entry: &str) -> bool {
        self.log().iter().any(|e| e == entry)
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    fn record(&self, entry: String) {
        self.state.lock().unwrap().log.push(entry);
    }
}

#[async_trait]
impl BrowserActions for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("navigate {url}"));
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.state.lock().unwrap().count(locator))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        Ok(self.state.lock().unwrap().count(locator) > 0)
    }

    async fn click_nth(&self, locator: &Locator, index: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.count(locator) <= index {
            return Err(BrowserError::SelectorNotFound(locator.to_string()));
        }
        let key = format!("{locator}#{index}");
        state.log.push(format!("click {key}"));
        state.apply(&key);
        if state.failing_clicks.contains(&key) {
            return Err(BrowserError::Timeout(format!("click {key}")));
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.count(locator) == 0 {
            return Err(BrowserError::SelectorNotFound(locator.to_string()));
        }
        state.log.push(format!("fill {locator}={value}"));
        Ok(())
    }

    async fn press_key(&self, locator: Option<&Locator>, key: &str) -> Result<()> {
        match locator {
            Some(locator) => self.record(format!("press {key} on {locator}")),
            None => self.record(format!("press {key}")),
        }
        Ok(())
    }

    async fn wait_for_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn wait_for_url_change(&self, from: &str, timeout: Duration) -> Result<()> {
        let url = self.url();
        if url != from {
            self.record(format!("url changed {url}"));
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(BrowserError::Timeout("url did not change".to_string()))
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push("reload".to_string());
        if state.reload_fails {
            return Err(BrowserError::Timeout("reload".to_string()));
        }
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(format!("<html><body>{}</body></html>", self.url()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let origin = courier_browser::extract_origin(&self.url())?;
        let mut local_storage = BTreeMap::new();
        local_storage.insert("token".to_string(), "abc".to_string());
        Ok(StorageState {
            origin,
            saved_at: Timestamp::now(),
            cookies: Vec::new(),
            local_storage,
        })
    }

    async fn restore_storage_state(&self, state: &StorageState) -> Result<()> {
        self.record(format!("restore {}", state.origin));
        Ok(())
    }

    async fn capture_download(
        &self,
        trigger: &Locator,
        dir: &Path,
        timeout: Duration,
    ) -> Result<PendingDownload> {
        let download = {
            let mut state = self.state.lock().unwrap();
            if state.count(trigger) == 0 {
                return Err(BrowserError::SelectorNotFound(trigger.to_string()));
            }
            state.log.push(format!("download {trigger}"));
            state.download.clone()
        };

        match download {
            Some((suggested, bytes)) => {
                let path = dir.join("5f0c1d2e-download");
                std::fs::write(&path, bytes)?;
                Ok(PendingDownload {
                    path,
                    suggested_filename: suggested,
                })
            }
            None => {
                tokio::time::sleep(timeout).await;
                Err(BrowserError::Timeout("no download".to_string()))
            }
        }
    }
}

/// Surface owner that may open one extra surface.
#[derive(Default)]
pub struct FakeHost {
    opened: Option<Arc<FakePage>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `page` as a newly opened surface.
    pub fn opening(page: Arc<FakePage>) -> Self {
        Self { opened: Some(page) }
    }
}

#[async_trait]
impl SurfaceHost for FakeHost {
    async fn surface_ids(&self) -> Result<Vec<String>> {
        Ok(vec!["main".to_string()])
    }

    async fn wait_for_new_surface(
        &self,
        _known: &[String],
        timeout: Duration,
    ) -> Result<Option<Arc<dyn BrowserActions>>> {
        match &self.opened {
            Some(page) => Ok(Some(Arc::clone(page) as Arc<dyn BrowserActions>)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }
}
