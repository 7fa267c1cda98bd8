//! Exponential backoff for transient provider errors.
//!
//! Rate limiting (429), network failures, and provider 5xx responses are
//! retried. Everything else, including a run that outlives its deadline, is
//! returned to the caller on first sight.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Runs `operation`, retrying transient errors up to `max_retries` extra
/// times with a `backoff_base_secs * 2^attempt` pause between attempts.
///
/// A 429 that names a longer `Retry-After` than the computed backoff waits
/// the longer of the two.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let mut delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        if let ScraperError::RateLimited { retry_after_secs } = &err {
            delay_secs = delay_secs.max(*retry_after_secs);
        }
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient scrape provider error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
