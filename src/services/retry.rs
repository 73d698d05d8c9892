use std::fmt::Display;
use std::future::Future;

use tokio::time::sleep;
use tracing::warn;

use crate::config::BlockRetryConfig;

/// Retries an async operation with exponential backoff capped at `max_backoff`.
/// `retries` counts attempts after the first.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut op: F,
    policy: BlockRetryConfig,
    label: &str,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut delay = policy.min_backoff;
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retries => {
                warn!(
                    operation = label,
                    attempt = attempt + 1,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after failure"
                );
                sleep(delay).await;
                delay = delay.saturating_mul(2).min(policy.max_backoff);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
