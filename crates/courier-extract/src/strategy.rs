//! Priority-ordered fallback lists.

use crate::error::{ExtractError, Result};
use crate::steps::Step;
use std::future::Future;
use tracing::debug;

/// Try candidates `0..labels.len()` in order and return the first success.
///
/// `attempt` yields `Ok(Some(_))` on success and `Ok(None)` when the
/// candidate does not apply. Errors from a candidate are logged and the next
/// one is tried. When every candidate is exhausted the step fails with a
/// single [`ExtractError::NoStrategySucceeded`].
pub async fn first_success<T, F, Fut>(
    step: Step,
    labels: &[String],
    mut attempt: F,
) -> Result<(usize, T)>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for (index, label) in labels.iter().enumerate() {
        match attempt(index).await {
            Ok(Some(value)) => {
                debug!("[{}] strategy '{}' succeeded", step, label);
                return Ok((index, value));
            }
            Ok(None) => debug!("[{}] strategy '{}' did not apply", step, label),
            Err(e) => debug!("[{}] strategy '{}' failed: {}", step, label, e),
        }
    }

    Err(ExtractError::NoStrategySucceeded {
        step,
        tried: labels.to_vec(),
    })
}
