#![cfg(unix)]

use courier_handoff::{HandoffError, HandoffRequest, Invocation, ProcessorHandoff};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("{body}\n")).unwrap();
    path
}

fn sh(script: PathBuf) -> Invocation {
    Invocation::Interpreted {
        interpreter: "sh".to_string(),
        script,
    }
}

fn request(dir: &Path) -> HandoffRequest {
    let reference = dir.join("couriers.csv");
    std::fs::write(&reference, "nome_do_motoboy,cidade,bairro,cep\n").unwrap();
    HandoffRequest {
        canonical_input: dir.join("deliveries.csv"),
        output_dir: dir.join("out"),
        reference_data: reference,
    }
}

#[tokio::test]
async fn test_success_reports_output_marker() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(
        tmp.path(),
        "processor",
        r#"echo "input=$1"
echo "output saved at: $2/entregas_3.xlsx""#,
    );

    let handoff = ProcessorHandoff::new(
        sh(script),
        Duration::from_secs(10),
    );
    let req = request(tmp.path());
    let report = handoff.invoke(&req).await.unwrap();

    assert!(report
        .stdout
        .contains(&format!("input={}", req.canonical_input.display())));
    assert_eq!(
        report.output_path,
        Some(req.output_dir.join("entregas_3.xlsx"))
    );
}

#[tokio::test]
async fn test_nonzero_exit_carries_both_streams() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(
        tmp.path(),
        "processor",
        "echo partial\necho \"KeyError: 'CEP'\" >&2\nexit 3",
    );

    let handoff = ProcessorHandoff::new(
        sh(script),
        Duration::from_secs(10),
    );
    let err = handoff.invoke(&request(tmp.path())).await.unwrap_err();

    match err {
        HandoffError::NonZeroExit {
            code,
            stdout,
            stderr,
        } => {
            assert_eq!(code, Some(3));
            assert_eq!(stdout.trim(), "partial");
            assert!(stderr.contains("KeyError"));
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_interpreted_invocation_passes_script_first() {
    let tmp = TempDir::new().unwrap();
    let script = tmp.path().join("processor.py");
    std::fs::write(&script, "echo \"script=$0 args=$#\"\n").unwrap();

    let handoff = ProcessorHandoff::new(
        Invocation::Interpreted {
            interpreter: "sh".to_string(),
            script: script.clone(),
        },
        Duration::from_secs(10),
    );
    let report = handoff.invoke(&request(tmp.path())).await.unwrap();

    assert!(report
        .stdout
        .contains(&format!("script={} args=3", script.display())));
    assert_eq!(report.output_path, None);
}

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let tmp = TempDir::new().unwrap();
    let handoff = ProcessorHandoff::new(
        Invocation::Standalone {
            program: tmp.path().join("absent"),
        },
        Duration::from_secs(10),
    );

    let err = handoff.invoke(&request(tmp.path())).await.unwrap_err();
    assert!(matches!(err, HandoffError::Spawn { .. }));
}

#[tokio::test]
async fn test_timeout() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(tmp.path(), "processor", "sleep 5");

    let handoff = ProcessorHandoff::new(
        sh(script),
        Duration::from_millis(200),
    );
    let err = handoff.invoke(&request(tmp.path())).await.unwrap_err();
    assert!(matches!(err, HandoffError::Timeout(_)));
}

#[tokio::test]
async fn test_missing_reference_file_still_runs() {
    let tmp = TempDir::new().unwrap();
    let script = write_script(tmp.path(), "processor", "exit 0");

    let handoff = ProcessorHandoff::new(
        sh(script),
        Duration::from_secs(10),
    );
    let mut req = request(tmp.path());
    req.reference_data = tmp.path().join("absent.csv");

    assert!(handoff.invoke(&req).await.is_ok());
}
