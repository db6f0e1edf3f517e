//! Make sure the target page is reachable without a login surface.

use crate::error::{ExtractError, Result};
use crate::selectors::PortalSelectors;
use crate::steps::Step;
use crate::strategy::first_success;
use courier_browser::{BrowserActions, SelectorMarker, SessionStatus, SessionStore};
use courier_core::PortalConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOGIN_FORM_TIMEOUT: Duration = Duration::from_secs(30);
const POST_LOGIN_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// How the page ended up authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The restored session was still valid
    SessionReused,
    /// Credentials were submitted and the session saved
    LoggedIn,
}

/// Navigate to the portal and log in when a login surface shows up.
pub async fn ensure_authenticated(
    page: &dyn BrowserActions,
    portal: &PortalConfig,
    selectors: &PortalSelectors,
    sessions: &SessionStore,
) -> Result<LoginOutcome> {
    let marker = SelectorMarker(selectors.login_form.clone());

    info!("Navigating to {}", portal.url);
    page.navigate(&portal.url).await?;

    if SessionStore::probe(page, &marker).await? == SessionStatus::Authenticated {
        info!("Session still valid, skipping login");
        return Ok(LoginOutcome::SessionReused);
    }

    info!("Login surface detected");
    if !portal.has_credentials() {
        return Err(ExtractError::Authentication(
            "login required but no credentials are configured".to_string(),
        ));
    }

    submit_credentials(page, portal, selectors).await?;

    if let Err(e) = page.wait_for_idle(POST_LOGIN_IDLE_TIMEOUT).await {
        debug!("Page not idle after login: {}", e);
    }

    match page.storage_state().await {
        Ok(state) => {
            if let Err(e) = sessions.save(&state) {
                warn!("Could not save session: {}", e);
            }
        }
        Err(e) => warn!("Could not capture session state: {}", e),
    }

    page.navigate(&portal.url).await?;
    if let Err(e) = page.wait_for_idle(POST_LOGIN_IDLE_TIMEOUT).await {
        debug!("Page not idle after returning to target: {}", e);
    }

    if SessionStore::probe(page, &marker).await? == SessionStatus::NeedsLogin {
        return Err(ExtractError::Authentication(
            "login form still present after submitting credentials".to_string(),
        ));
    }

    info!("Login succeeded");
    Ok(LoginOutcome::LoggedIn)
}

async fn submit_credentials(
    page: &dyn BrowserActions,
    portal: &PortalConfig,
    selectors: &PortalSelectors,
) -> Result<()> {
    page.wait_for_selector(&selectors.login_form, LOGIN_FORM_TIMEOUT)
        .await
        .map_err(|e| ExtractError::Authentication(format!("login form not ready: {e}")))?;

    page.fill(&selectors.login_email, &portal.username).await?;
    page.fill(&selectors.login_password, &portal.password).await?;
    debug!("Credentials filled");

    let labels: Vec<String> = selectors.login_submit.iter().map(ToString::to_string).collect();
    let clicked = first_success(Step::Authenticate, &labels, |i| {
        let submit = &selectors.login_submit[i];
        async move {
            if page.count(submit).await? == 0 {
                return Ok(None);
            }
            page.click(submit).await?;
            Ok(Some(()))
        }
    })
    .await;

    if clicked.is_err() {
        debug!("No submit control found, pressing Enter in the password field");
        page.press_key(Some(&selectors.login_password), "Enter").await?;
    }
    Ok(())
}
