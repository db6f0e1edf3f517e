//! One full attempt: browser session, extraction, conversion and handoff.

use crate::diagnostics::Diagnostics;
use crate::download::ExtractionArtifact;
use crate::error::{AttemptError, ExtractError};
use crate::login::{ensure_authenticated, LoginOutcome};
use crate::orchestrator::{ExtractionOrchestrator, Timings};
use crate::run::RunProgress;
use crate::selectors::PortalSelectors;
use crate::steps::Step;
use courier_browser::{
    extract_origin, BrowserActions, BrowserEngine, EngineOptions, SessionStore, SurfaceHost,
};
use courier_core::{AppConfig, PortalConfig, RunId};
use courier_handoff::{HandoffReport, HandoffRequest, ProcessorHandoff};
use courier_sheets::{convert_workbook, CanonicalFile, CANONICAL_FILE_NAME};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Receives progress notifications of an attempt.
pub type ProgressSink<'a> = &'a (dyn Fn(RunProgress) + Send + Sync);

/// Everything an attempt needs, built once per run.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    pub portal: PortalConfig,
    pub engine: EngineOptions,
    pub sessions: SessionStore,
    pub orchestrator: ExtractionOrchestrator,
    pub handoff: ProcessorHandoff,
    pub output_dir: PathBuf,
    pub reference_file: PathBuf,
}

impl AttemptContext {
    pub fn from_config(config: &AppConfig, run: &RunId) -> Result<Self, AttemptError> {
        let paths = &config.paths;
        let orchestrator = ExtractionOrchestrator::new(
            PortalSelectors::from(&config.extraction),
            Timings::from(&config.extraction),
            &paths.download_dir,
            Diagnostics::new(&paths.diagnostics_dir).for_run(run),
        );

        Ok(Self {
            portal: config.portal.clone(),
            engine: EngineOptions::from(&config.browser),
            sessions: SessionStore::new(&paths.session_file),
            orchestrator,
            handoff: ProcessorHandoff::from_config(&config.processor)?,
            output_dir: paths.output_dir.clone(),
            reference_file: paths.reference_file.clone(),
        })
    }

    /// Path of the canonical CSV handed to the processor.
    pub fn canonical_path(&self) -> PathBuf {
        self.orchestrator.download_dir().join(CANONICAL_FILE_NAME)
    }
}

/// What a successful attempt produced.
#[derive(Debug, Clone)]
pub struct AttemptSuccess {
    pub login: LoginOutcome,
    pub artifact: ExtractionArtifact,
    pub canonical: CanonicalFile,
    pub handoff: HandoffReport,
}

/// Run one attempt in a freshly launched browser, closing it afterwards.
pub async fn run_attempt(
    ctx: &AttemptContext,
    progress: ProgressSink<'_>,
) -> Result<AttemptSuccess, AttemptError> {
    let engine = BrowserEngine::launch(&ctx.engine)
        .await
        .map_err(ExtractError::from)?;

    let result = match engine.new_surface().await {
        Ok(page) => execute_attempt(page, &engine, ctx, progress).await,
        Err(e) => Err(ExtractError::from(e).into()),
    };

    engine.close().await;
    result
}

/// Run one attempt on an already open surface.
pub async fn execute_attempt(
    page: Arc<dyn BrowserActions>,
    host: &dyn SurfaceHost,
    ctx: &AttemptContext,
    progress: ProgressSink<'_>,
) -> Result<AttemptSuccess, AttemptError> {
    let origin = extract_origin(&ctx.portal.url).map_err(ExtractError::from)?;
    if let Some(state) = ctx.sessions.load_for(&origin) {
        match page.restore_storage_state(&state).await {
            Ok(()) => info!("Restored session from {}", ctx.sessions.path().display()),
            Err(e) => warn!("Could not restore session: {}", e),
        }
    }

    let observe = |step| progress(RunProgress::Step(step));
    observe(Step::Authenticate);
    let login = match ensure_authenticated(
        page.as_ref(),
        &ctx.portal,
        ctx.orchestrator.selectors(),
        &ctx.sessions,
    )
    .await
    {
        Ok(login) => login,
        Err(e) => {
            warn!("Authentication failed: {}", e);
            ctx.orchestrator
                .diagnostics()
                .capture(page.as_ref(), Step::Authenticate.label())
                .await;
            return Err(e.into());
        }
    };
    let artifact = ctx.orchestrator.run(page, host, &observe).await?;

    progress(RunProgress::Converting);
    let canonical = convert_workbook(&artifact.path, &ctx.canonical_path())?;
    info!(
        "Converted sheet '{}' ({} rows) to {}",
        canonical.sheet,
        canonical.rows,
        canonical.path.display()
    );

    progress(RunProgress::Processing);
    let request = HandoffRequest {
        canonical_input: canonical.path.clone(),
        output_dir: ctx.output_dir.clone(),
        reference_data: ctx.reference_file.clone(),
    };
    let handoff = ctx.handoff.invoke(&request).await?;

    Ok(AttemptSuccess {
        login,
        artifact,
        canonical,
        handoff,
    })
}
