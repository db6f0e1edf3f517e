//! The report extraction workflow.
//!
//! Steps run strictly in order on one browsing surface (which may switch to a
//! newly opened one when the results surface opens). Every wait is bounded.
//! Steps with several possible UI shapes walk a priority-ordered strategy
//! list and fail only when every entry is exhausted.
//!
//! When a step fails, a screenshot and markup dump of the current surface are
//! captured before the error is returned.

use crate::diagnostics::Diagnostics;
use crate::download::{finalize_download, ExtractionArtifact};
use crate::error::{ExtractError, Result};
use crate::selectors::PortalSelectors;
use crate::steps::Step;
use crate::strategy::first_success;
use courier_browser::{BrowserActions, BrowserError, Locator, SurfaceHost};
use courier_core::ExtractionConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SEARCH_BUTTON_TIMEOUT: Duration = Duration::from_secs(15);
const EXPORT_BUTTON_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOADS_CONFIRM_TIMEOUT: Duration = Duration::from_secs(20);
const REFRESH_IDLE_TIMEOUT: Duration = Duration::from_secs(15);
const LINK_VISIBLE_TIMEOUT: Duration = Duration::from_secs(3);
/// Pause after typing into a widget search field before reading its options
const OPTION_SETTLE: Duration = Duration::from_millis(300);

/// Callback receiving each step as it starts.
pub type StepObserver<'a> = &'a (dyn Fn(Step) + Send + Sync);

/// Timing knobs of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    pub idle_timeout: Duration,
    pub settle_delay: Duration,
    pub surface_timeout: Duration,
    pub download_timeout: Duration,
}

impl From<&ExtractionConfig> for Timings {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            surface_timeout: Duration::from_secs(config.surface_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }
}

/// Drives the portal from the authenticated landing page to a downloaded
/// report.
#[derive(Debug, Clone)]
pub struct ExtractionOrchestrator {
    selectors: PortalSelectors,
    timings: Timings,
    download_dir: PathBuf,
    diagnostics: Diagnostics,
}

impl ExtractionOrchestrator {
    pub fn new(
        selectors: PortalSelectors,
        timings: Timings,
        download_dir: impl Into<PathBuf>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            selectors,
            timings,
            download_dir: download_dir.into(),
            diagnostics,
        }
    }

    pub fn selectors(&self) -> &PortalSelectors {
        &self.selectors
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run every step, starting on `page`.
    pub async fn run(
        &self,
        page: Arc<dyn BrowserActions>,
        host: &dyn SurfaceHost,
        observe: StepObserver<'_>,
    ) -> Result<ExtractionArtifact> {
        let mut surface = page;
        let mut step = Step::SelectFilter;

        match self.run_steps(&mut surface, &mut step, host, observe).await {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                warn!("Step '{}' failed: {}", step, e);
                self.diagnostics.capture(surface.as_ref(), step.label()).await;
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        surface: &mut Arc<dyn BrowserActions>,
        step: &mut Step,
        host: &dyn SurfaceHost,
        observe: StepObserver<'_>,
    ) -> Result<ExtractionArtifact> {
        let mut enter = |next: Step| {
            *step = next;
            info!("Step: {}", next);
            observe(next);
        };

        enter(Step::SelectFilter);
        self.select_filter(surface.as_ref()).await?;

        enter(Step::Search);
        self.search(surface.as_ref()).await?;

        enter(Step::Export);
        self.export(surface.as_ref()).await?;

        enter(Step::DeclineConfirmation);
        self.decline_confirmation(surface.as_ref()).await?;

        enter(Step::OpenResults);
        *surface = self.open_results(Arc::clone(surface), host).await?;

        enter(Step::Refresh);
        self.settle_and_refresh(surface.as_ref()).await;

        enter(Step::LocateDownload);
        let link = self.locate_download_link(surface.as_ref()).await?;

        enter(Step::Download);
        self.download(surface.as_ref(), &link).await
    }

    /// Select the configured filter value in the first widget that accepts it.
    ///
    /// A widget accepts once its search field takes the value and a matching
    /// option shows up. An error from clicking that option is only logged;
    /// the widget still counts as accepted.
    pub async fn select_filter(&self, page: &dyn BrowserActions) -> Result<()> {
        let s = &self.selectors;
        if page.count(&s.filter_selected).await? > 0 {
            info!("Filter value already selected");
            return Ok(());
        }

        let widgets = page.count(&s.filter_widgets).await?;
        debug!("Found {} selection widgets", widgets);
        let labels: Vec<String> = (1..=widgets)
            .map(|i| format!("{} #{i}", s.filter_widgets))
            .collect();

        first_success(Step::SelectFilter, &labels, |i| async move {
            if let Err(e) = page.click_nth(&s.filter_widgets, i).await {
                debug!("Widget #{} did not open: {}", i + 1, e);
            }

            if page.count(&s.filter_search).await? == 0 {
                dismiss(page).await;
                return Ok(None);
            }

            page.fill(&s.filter_search, &s.filter_value).await?;
            tokio::time::sleep(OPTION_SETTLE).await;

            if page.count(&s.filter_option).await? == 0 {
                dismiss(page).await;
                return Ok(None);
            }
            if let Err(e) = page.click(&s.filter_option).await {
                debug!("Option click reported an error: {}", e);
            }
            Ok(Some(()))
        })
        .await?;

        info!("Filter value selected");
        Ok(())
    }

    async fn search(&self, page: &dyn BrowserActions) -> Result<()> {
        let button = &self.selectors.search_button;
        page.wait_for_selector(button, SEARCH_BUTTON_TIMEOUT).await?;
        page.click(button).await?;
        tolerate_idle(page, self.timings.idle_timeout).await;
        Ok(())
    }

    async fn export(&self, page: &dyn BrowserActions) -> Result<()> {
        let button = &self.selectors.export_button;
        page.wait_for_selector(button, EXPORT_BUTTON_TIMEOUT).await?;
        page.click(button).await?;
        info!("Export requested");
        Ok(())
    }

    async fn decline_confirmation(&self, page: &dyn BrowserActions) -> Result<()> {
        let button = &self.selectors.decline_button;
        if page.count(button).await? > 0 {
            page.click(button).await?;
            info!("Confirmation dialog declined");
        } else {
            debug!("No confirmation dialog");
        }
        Ok(())
    }

    /// Open the results surface: a new surface if one appears, otherwise the
    /// current one (navigated or not).
    async fn open_results(
        &self,
        page: Arc<dyn BrowserActions>,
        host: &dyn SurfaceHost,
    ) -> Result<Arc<dyn BrowserActions>> {
        let confirm = &self.selectors.downloads_confirm;
        page.wait_for_selector(confirm, DOWNLOADS_CONFIRM_TIMEOUT).await?;

        let known = host.surface_ids().await?;
        let from = page.current_url().await?;
        page.click(confirm).await?;

        let timeout = self.timings.surface_timeout;
        let new_surface = host.wait_for_new_surface(&known, timeout);
        let navigated = page.wait_for_url_change(&from, timeout);

        let results = tokio::select! {
            Ok(Some(opened)) = new_surface => {
                info!("Results opened in a new surface");
                opened
            }
            Ok(()) = navigated => {
                info!("Results opened in the current surface");
                Arc::clone(&page)
            }
            else => {
                info!("No navigation observed, staying on the current surface");
                Arc::clone(&page)
            }
        };
        Ok(results)
    }

    async fn settle_and_refresh(&self, page: &dyn BrowserActions) {
        debug!("Waiting {:?} before refreshing", self.timings.settle_delay);
        tokio::time::sleep(self.timings.settle_delay).await;

        if let Err(e) = page.reload().await {
            debug!("Reload failed: {}", e);
        }
        tolerate_idle(page, REFRESH_IDLE_TIMEOUT).await;
    }

    async fn locate_download_link(&self, page: &dyn BrowserActions) -> Result<Locator> {
        let links = &self.selectors.download_links;
        let labels: Vec<String> = links.iter().map(ToString::to_string).collect();

        let (_, link) = first_success(Step::LocateDownload, &labels, |i| async move {
            let link = &links[i];
            if page.count(link).await? == 0 {
                return Ok(None);
            }
            page.wait_for_selector(link, LINK_VISIBLE_TIMEOUT).await?;
            Ok(Some(link.clone()))
        })
        .await?;

        info!("Download link found: {}", link);
        Ok(link)
    }

    async fn download(&self, page: &dyn BrowserActions, link: &Locator) -> Result<ExtractionArtifact> {
        std::fs::create_dir_all(&self.download_dir)?;

        let pending = page
            .capture_download(link, &self.download_dir, self.timings.download_timeout)
            .await
            .map_err(|e| match e {
                BrowserError::Timeout(_) => ExtractError::Download(format!(
                    "no download completed within {:?}",
                    self.timings.download_timeout
                )),
                other => other.into(),
            })?;

        finalize_download(pending, &self.download_dir)
    }
}

async fn dismiss(page: &dyn BrowserActions) {
    if let Err(e) = page.press_key(None, "Escape").await {
        debug!("Escape failed: {}", e);
    }
}

async fn tolerate_idle(page: &dyn BrowserActions, timeout: Duration) {
    if let Err(e) = page.wait_for_idle(timeout).await {
        debug!("Continuing without idle page: {}", e);
    }
}
