//! Bounded retry of whole attempts.

use crate::error::AttemptError;
use courier_core::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `base_delay × attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// Final result of a retried run.
#[derive(Debug)]
pub struct RunReport<T> {
    pub result: Result<T, AttemptError>,
    /// Attempts actually made
    pub attempts: u32,
    /// Delays waited between attempts, in order
    pub delays: Vec<Duration>,
}

impl<T> RunReport<T> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `attempt` until it succeeds, fails fatally, or attempts run out.
///
/// `before_retry` is told about each scheduled retry (failed attempt number,
/// delay, error) before the delay starts.
pub async fn run_with_retry<T, F, Fut, R>(
    policy: RetryPolicy,
    mut attempt: F,
    mut before_retry: R,
) -> RunReport<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
    R: FnMut(u32, Duration, &AttemptError),
{
    let mut delays = Vec::new();
    let mut number = 1;

    loop {
        info!("Attempt {}/{}", number, policy.max_attempts);
        match attempt(number).await {
            Ok(value) => {
                info!("Attempt {} succeeded", number);
                return RunReport {
                    result: Ok(value),
                    attempts: number,
                    delays,
                };
            }
            Err(e) => {
                let exhausted = number >= policy.max_attempts;
                if exhausted || e.is_fatal_for_run() {
                    if exhausted {
                        error!("Attempt {} failed, no attempts left: {}", number, e);
                    } else {
                        error!("Attempt {} failed, not retrying: {}", number, e);
                    }
                    return RunReport {
                        result: Err(e),
                        attempts: number,
                        delays,
                    };
                }

                let delay = policy.delay_after(number);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    number, policy.max_attempts, e, delay
                );
                before_retry(number, delay, &e);
                tokio::time::sleep(delay).await;
                delays.push(delay);
                number += 1;
            }
        }
    }
}
