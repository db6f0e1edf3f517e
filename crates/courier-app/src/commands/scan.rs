use crate::commands::lookup::{lookup_code, render};
use anyhow::Result;
use courier_core::AppConfig;
use courier_scan::{ClassifierConfig, ScanClassifier, ScanHandle, ScanInput, ScanKey};
use std::iter;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// How long to wait for the classifier to settle on a line.
const DECISION_WAIT: Duration = Duration::from_secs(2);

/// Type `line` into the field as keystrokes followed by Enter.
pub fn feed_line(handle: &ScanHandle, line: &str) -> bool {
    line.chars()
        .map(|c| ScanInput::Key(ScanKey::Char(c)))
        .chain(iter::once(ScanInput::Key(ScanKey::Enter)))
        .all(|input| handle.send(input))
}

pub async fn execute(config: &AppConfig) -> Result<ExitCode> {
    let classifier = ScanClassifier::new(ClassifierConfig::from(&config.scanner));
    let (handle, mut decisions, task) = courier_scan::spawn(classifier);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Ready. Scan or type a code and press Enter (Ctrl-D to quit).");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if !feed_line(&handle, &line) {
            break;
        }

        match tokio::time::timeout(DECISION_WAIT, decisions.recv()).await {
            Ok(Some(decision)) => {
                info!(
                    code = %decision.code,
                    namespace = %decision.namespace,
                    "Scan finalized ({:?}, {:?})",
                    decision.source,
                    decision.trigger
                );
                println!("[{}] {}", decision.code, render(&lookup_code(config, &decision.code)));
            }
            Ok(None) => break,
            Err(_) => debug!("No lookup for {:?}, repeated scan", line),
        }
        handle.send(ScanInput::Clear);
    }

    drop(handle);
    task.await?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::CodeNamespace;
    use courier_scan::{ScanSource, ScanTrigger};

    #[tokio::test(start_paused = true)]
    async fn test_scanned_payload_line() {
        let (handle, mut decisions, _task) = courier_scan::spawn(ScanClassifier::default());

        assert!(feed_line(&handle, r#"{"id":"77","type":"label"}"#));
        let decision = decisions.recv().await.unwrap();
        assert_eq!(decision.code, "77");
        assert_eq!(decision.source, ScanSource::StructuredPayload);
        assert_eq!(decision.trigger, ScanTrigger::Automatic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_code_line() {
        let (handle, mut decisions, _task) = courier_scan::spawn(ScanClassifier::default());

        assert!(feed_line(&handle, " br55 "));
        let decision = decisions.recv().await.unwrap();
        assert_eq!(decision.code, "br55");
        assert_eq!(decision.namespace, CodeNamespace::Alternate);
        assert_eq!(decision.source, ScanSource::Raw);
    }
}
