use std::time::Duration;

use exponential_backoff::Backoff;

use crate::error::SourceError;

/// Retries `op` once, after a short backoff, when the first attempt fails
/// with a [`SourceError::is_transient`] error (spec §7). Any other failure,
/// or a second failure after the retry, is returned as-is.
pub async fn retry_once<F, Fut>(op: F) -> Result<tables::Table, SourceError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<tables::Table, SourceError>>,
{
    match op().await {
        Ok(table) => Ok(table),
        Err(err) if err.is_transient() => {
            let backoff = Backoff::new(1, Duration::from_millis(100), Duration::from_secs(2));
            if let Some(delay) = backoff.iter().next() {
                tokio::time::sleep(delay).await;
            }
            op().await
        }
        Err(err) => Err(err),
    }
}
