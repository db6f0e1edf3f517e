mod common;

use common::{Effect, FakeHost, FakePage};
use courier_browser::{EngineOptions, SessionStore, StorageState};
use courier_core::{PortalConfig, RunId, Timestamp};
use courier_extract::{
    ensure_authenticated, execute_attempt, AttemptContext, AttemptError, Diagnostics,
    ExtractError, ExtractionOrchestrator, LoginOutcome, PortalSelectors, RunProgress, Step,
    Timings,
};
use courier_handoff::{Invocation, ProcessorHandoff};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const PORTAL_URL: &str = "https://portal.example.com/operations";

fn portal(username: &str, password: &str) -> PortalConfig {
    PortalConfig {
        url: PORTAL_URL.to_string(),
        username: username.to_string(),
        password: password.to_string(),
    }
}

fn timings() -> Timings {
    Timings {
        idle_timeout: Duration::from_secs(60),
        settle_delay: Duration::from_secs(15),
        surface_timeout: Duration::from_secs(8),
        download_timeout: Duration::from_secs(60),
    }
}

fn orchestrator(dir: &Path) -> ExtractionOrchestrator {
    ExtractionOrchestrator::new(
        PortalSelectors::default(),
        timings(),
        dir.join("downloads"),
        Diagnostics::new(dir.join("diagnostics")),
    )
}

/// A report page on which every step up to the results surface succeeds.
fn report_page(s: &PortalSelectors) -> FakePage {
    FakePage::new(PORTAL_URL)
        .with(&s.filter_widgets, 1)
        .on_click(&s.filter_widgets, Effect::Show(s.filter_search.clone(), 1))
        .on_click(&s.filter_widgets, Effect::Show(s.filter_option.clone(), 1))
        .with(&s.search_button, 1)
        .with(&s.export_button, 1)
        .on_click(&s.export_button, Effect::Show(s.downloads_confirm.clone(), 1))
}

fn saved_session(dir: &Path) -> SessionStore {
    let store = SessionStore::new(dir.join("session.json"));
    let mut local_storage = BTreeMap::new();
    local_storage.insert("token".to_string(), "abc".to_string());
    store
        .save(&StorageState {
            origin: "https://portal.example.com".to_string(),
            saved_at: Timestamp::now(),
            cookies: Vec::new(),
            local_storage,
        })
        .expect("save session");
    store
}

#[tokio::test]
async fn test_existing_session_skips_login() {
    let tmp = TempDir::new().unwrap();
    let sessions = saved_session(tmp.path());
    let page = FakePage::new("about:blank");

    let outcome = ensure_authenticated(
        &page,
        &portal("", ""),
        &PortalSelectors::default(),
        &sessions,
    )
    .await
    .expect("authenticated");

    assert_eq!(outcome, LoginOutcome::SessionReused);
    assert_eq!(page.log(), vec![format!("navigate {PORTAL_URL}")]);
}

#[tokio::test]
async fn test_login_flow_saves_session() {
    let tmp = TempDir::new().unwrap();
    let sessions = SessionStore::new(tmp.path().join("session.json"));
    let s = PortalSelectors::default();
    let page = FakePage::new("about:blank")
        .with(&s.login_form, 1)
        .with(&s.login_email, 1)
        .with(&s.login_password, 1)
        .with(&s.login_submit[0], 1)
        .on_click(&s.login_submit[0], Effect::Hide(s.login_form.clone()));

    let outcome = ensure_authenticated(&page, &portal("ops@example.com", "hunter2"), &s, &sessions)
        .await
        .expect("logged in");

    assert_eq!(outcome, LoginOutcome::LoggedIn);
    assert!(page.logged(&format!("fill {}=ops@example.com", s.login_email)));
    assert!(page.logged(&format!("click {}#0", s.login_submit[0])));
    let stored = sessions.load().expect("session saved");
    assert_eq!(stored.origin, "https://portal.example.com");
}

#[tokio::test]
async fn test_login_without_submit_button_presses_enter() {
    let tmp = TempDir::new().unwrap();
    let sessions = SessionStore::new(tmp.path().join("session.json"));
    let s = PortalSelectors::default();
    let page = FakePage::new("about:blank")
        .with(&s.login_form, 1)
        .with(&s.login_email, 1)
        .with(&s.login_password, 1);

    let err = ensure_authenticated(&page, &portal("ops@example.com", "hunter2"), &s, &sessions)
        .await
        .expect_err("form never goes away");

    assert!(page.logged(&format!("press Enter on {}", s.login_password)));
    assert!(matches!(err, ExtractError::Authentication(_)));
}

#[tokio::test]
async fn test_login_required_without_credentials() {
    let tmp = TempDir::new().unwrap();
    let sessions = SessionStore::new(tmp.path().join("session.json"));
    let s = PortalSelectors::default();
    let page = FakePage::new("about:blank").with(&s.login_form, 1);

    let err = ensure_authenticated(&page, &portal("", ""), &s, &sessions)
        .await
        .expect_err("credentials are missing");

    assert!(matches!(err, ExtractError::Authentication(_)));
    assert!(!page.log().iter().any(|e| e.starts_with("fill")));
}

#[tokio::test]
async fn test_filter_already_selected_is_noop() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors();
    let page = FakePage::new(PORTAL_URL)
        .with(&s.filter_selected, 1)
        .with(&s.filter_widgets, 3);

    orchestrator.select_filter(&page).await.expect("no-op");
    assert!(page.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_widget_without_search_field_is_dismissed() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors();
    let page = FakePage::new(PORTAL_URL)
        .with(&s.filter_widgets, 2)
        .on_click_nth(&s.filter_widgets, 1, Effect::Show(s.filter_search.clone(), 1))
        .on_click_nth(&s.filter_widgets, 1, Effect::Show(s.filter_option.clone(), 1));

    orchestrator.select_filter(&page).await.expect("second widget works");

    let log = page.log();
    let first = format!("click {}#0", s.filter_widgets);
    let escape = "press Escape".to_string();
    let second = format!("click {}#1", s.filter_widgets);
    let position = |entry: &String| log.iter().position(|e| e == entry).expect("logged");
    assert!(position(&first) < position(&escape));
    assert!(position(&escape) < position(&second));
    assert!(page.logged(&format!("fill {}=Paraná", s.filter_search)));
    assert!(page.logged(&format!("click {}#0", s.filter_option)));
}

#[tokio::test(start_paused = true)]
async fn test_option_click_error_still_selects() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors();
    let page = FakePage::new(PORTAL_URL)
        .with(&s.filter_widgets, 2)
        .on_click(&s.filter_widgets, Effect::Show(s.filter_search.clone(), 1))
        .on_click(&s.filter_widgets, Effect::Show(s.filter_option.clone(), 1))
        .failing_click_nth(&s.filter_option, 0);

    orchestrator.select_filter(&page).await.expect("option click error ignored");

    assert!(page.logged(&format!("click {}#0", s.filter_option)));
    assert!(!page.logged(&format!("click {}#1", s.filter_widgets)));
}

#[tokio::test(start_paused = true)]
async fn test_no_widget_accepts_filter() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors();
    let page = FakePage::new(PORTAL_URL).with(&s.filter_widgets, 2);

    let err = orchestrator.select_filter(&page).await.expect_err("nothing accepts");
    match err {
        ExtractError::NoStrategySucceeded { step, tried } => {
            assert_eq!(step, Step::SelectFilter);
            assert_eq!(tried.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_workflow_on_current_surface() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    let page = Arc::new(
        report_page(&s)
            .with(&s.download_links[1], 1)
            .with_download(Some("relatorio_operacao.xlsx"), b"PK-bytes"),
    );

    let steps = Mutex::new(Vec::new());
    let observe = |step: Step| steps.lock().unwrap().push(step);
    let artifact = orchestrator
        .run(page.clone(), &FakeHost::new(), &observe)
        .await
        .expect("workflow succeeds");

    assert_eq!(
        artifact.path,
        tmp.path().join("downloads").join("relatorio_operacao.xlsx")
    );
    assert_eq!(std::fs::read(&artifact.path).unwrap(), b"PK-bytes");
    assert_eq!(
        steps.into_inner().unwrap(),
        vec![
            Step::SelectFilter,
            Step::Search,
            Step::Export,
            Step::DeclineConfirmation,
            Step::OpenResults,
            Step::Refresh,
            Step::LocateDownload,
            Step::Download,
        ]
    );
    assert!(page.logged("reload"));
    assert!(page.logged(&format!("download {}", s.download_links[1])));
    assert!(!page.log().iter().any(|e| e.starts_with("url changed")));
}

#[tokio::test(start_paused = true)]
async fn test_results_by_navigating_current_surface() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    let downloads_url = "https://portal.example.com/downloads";
    let page = Arc::new(
        report_page(&s)
            .on_click(&s.downloads_confirm, Effect::Navigate(downloads_url.to_string()))
            .with(&s.download_links[0], 1)
            .with_download(Some("relatorio.xlsx"), b"PK"),
    );

    let started = tokio::time::Instant::now();
    let artifact = orchestrator
        .run(page.clone(), &FakeHost::new(), &|_: Step| {})
        .await
        .expect("workflow succeeds");

    assert!(page.logged(&format!("url changed {downloads_url}")));
    assert_eq!(page.url(), downloads_url);
    assert!(page.logged("reload"));
    assert!(artifact.path.ends_with("relatorio.xlsx"));
    // No wait for a new surface: only the settle delay passes
    assert!(started.elapsed() < timings().settle_delay + timings().surface_timeout);
}

#[tokio::test(start_paused = true)]
async fn test_failed_reload_does_not_stop_workflow() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    let page = Arc::new(
        report_page(&s)
            .failing_reload()
            .with(&s.download_links[0], 1)
            .with_download(Some("relatorio.xlsx"), b"PK-bytes"),
    );

    let artifact = orchestrator
        .run(page.clone(), &FakeHost::new(), &|_: Step| {})
        .await
        .expect("reload errors are tolerated");

    assert!(page.logged("reload"));
    assert!(page.logged(&format!("download {}", s.download_links[0])));
    assert_eq!(std::fs::read(&artifact.path).unwrap(), b"PK-bytes");
}

#[tokio::test(start_paused = true)]
async fn test_results_in_new_surface() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    let page = Arc::new(report_page(&s).with(&s.decline_button, 1));
    let results = Arc::new(
        FakePage::new("https://portal.example.com/downloads")
            .with(&s.download_links[0], 1)
            .with_download(None, b"PK"),
    );

    let artifact = orchestrator
        .run(page.clone(), &FakeHost::opening(results.clone()), &|_: Step| {})
        .await
        .expect("workflow succeeds");

    assert!(page.logged(&format!("click {}#0", s.decline_button)));
    assert!(results.logged("reload"));
    assert!(!page.logged("reload"));
    let name = artifact.path.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("report-") && name.ends_with(".xlsx"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_download_link_captures_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    let page = Arc::new(report_page(&s));

    let err = orchestrator
        .run(page, &FakeHost::new(), &|_: Step| {})
        .await
        .expect_err("no link");

    match err {
        ExtractError::NoStrategySucceeded { step, tried } => {
            assert_eq!(step, Step::LocateDownload);
            assert_eq!(tried.len(), s.download_links.len());
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut captured: Vec<String> = std::fs::read_dir(tmp.path().join("diagnostics"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    captured.sort();
    assert_eq!(captured.len(), 2);
    assert!(captured[0].ends_with("-locate-download-link.html"));
    assert!(captured[1].ends_with("-locate-download-link.png"));
}

#[tokio::test]
async fn test_diagnostics_carry_run_id() {
    let tmp = TempDir::new().unwrap();
    let run = RunId::generate();
    let diagnostics = Diagnostics::new(tmp.path()).for_run(&run);

    let written = diagnostics
        .capture(&FakePage::new(PORTAL_URL), "Locate download link")
        .await;

    assert_eq!(written.len(), 2);
    for path in &written {
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(&format!("failure-{run}-")), "{name}");
        assert!(name.contains("-Locate-download-link."), "{name}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_download_timeout_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    let page = Arc::new(report_page(&s).with(&s.download_links[3], 1));

    let err = orchestrator
        .run(page, &FakeHost::new(), &|_: Step| {})
        .await
        .expect_err("download never starts");
    assert!(matches!(err, ExtractError::Download(_)));
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_spreadsheet_fails_the_run() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = orchestrator(tmp.path());
    let s = orchestrator.selectors().clone();
    saved_session(tmp.path());

    let ctx = AttemptContext {
        portal: portal("", ""),
        engine: EngineOptions::default(),
        sessions: SessionStore::new(tmp.path().join("session.json")),
        orchestrator,
        handoff: ProcessorHandoff::new(
            Invocation::Standalone {
                program: "true".into(),
            },
            Duration::from_secs(5),
        ),
        output_dir: tmp.path().join("out"),
        reference_file: tmp.path().join("couriers.csv"),
    };
    let page = Arc::new(
        report_page(&s)
            .with(&s.download_links[0], 1)
            .with_download(Some("relatorio.xlsx"), b"definitely not a workbook"),
    );

    let progress = Mutex::new(Vec::new());
    let sink = |update: RunProgress| progress.lock().unwrap().push(update);
    let err = execute_attempt(page.clone(), &FakeHost::new(), &ctx, &sink)
        .await
        .expect_err("conversion fails");

    assert!(matches!(err, AttemptError::Conversion(_)));
    assert!(err.is_fatal_for_run());
    assert!(page.logged("restore https://portal.example.com"));
    assert!(!ctx.canonical_path().exists());

    let progress = progress.into_inner().unwrap();
    assert_eq!(progress.first(), Some(&RunProgress::Step(Step::Authenticate)));
    assert_eq!(progress.last(), Some(&RunProgress::Converting));
}
