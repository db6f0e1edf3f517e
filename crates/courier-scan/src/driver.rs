//! Async driver running one [`ScanClassifier`] on its own task.
//!
//! Inputs arrive over a channel and are stamped on receipt; burst and
//! debounce deadlines are served with `sleep_until`, so a new input always
//! cancels and reschedules the pending timer.

use crate::classifier::{ScanClassifier, ScanDecision, ScanEvent, ScanInput};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Sending half for one lookup field.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    inputs: mpsc::UnboundedSender<ScanInput>,
}

impl ScanHandle {
    /// Queue an input; `false` once the driver has stopped.
    pub fn send(&self, input: ScanInput) -> bool {
        self.inputs.send(input).is_ok()
    }
}

/// Spawn the driver task. Dropping every [`ScanHandle`] stops it.
pub fn spawn(
    classifier: ScanClassifier,
) -> (
    ScanHandle,
    mpsc::UnboundedReceiver<ScanDecision>,
    JoinHandle<()>,
) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (decision_tx, decision_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(classifier, input_rx, decision_tx));
    (ScanHandle { inputs: input_tx }, decision_rx, task)
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn run(
    mut classifier: ScanClassifier,
    mut inputs: mpsc::UnboundedReceiver<ScanInput>,
    decisions: mpsc::UnboundedSender<ScanDecision>,
) {
    loop {
        let deadline = classifier.next_deadline();
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else { break };
                trace!("Scan input {:?}", input);
                if let Some(decision) = classifier.handle(ScanEvent::new(input, Instant::now())) {
                    if decisions.send(decision).is_err() {
                        break;
                    }
                }
            }
            () = wait_for(deadline) => {
                for decision in classifier.on_timer(Instant::now()) {
                    if decisions.send(decision).is_err() {
                        return;
                    }
                }
            }
        }
    }
    debug!("Scan driver stopped");
}
