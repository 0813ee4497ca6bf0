use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry an async operation with a fixed backoff schedule.
///
/// # Arguments
/// * `operation` - The async operation to retry
/// * `delays` - Wait before each retry; `delays.len()` retries at most
/// * `should_retry` - Whether a given error is worth another attempt
///
/// # Returns
/// The first success, the first non-retryable error, or the last error once
/// the schedule is exhausted
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    mut operation: F,
    delays: &[Duration],
    should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let total_attempts = delays.len() + 1;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let Some(delay) = delays.get(attempt - 1) else {
                    return Err(e);
                };
                if !should_retry(&e) {
                    return Err(e);
                }
                warn!(
                    "Request failed (attempt {attempt}/{total_attempts}): {e}. Retrying after {delay:?}..."
                );
                sleep(*delay).await;
                attempt += 1;
            }
        }
    }
}
