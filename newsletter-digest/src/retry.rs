use crate::types::RetryOptions;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

impl RetryOptions {
    /// Deterministic doubling schedule: base, 2*base, 4*base... capped at max.
    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let base = Duration::from_millis(self.base_delay_ms);
        ExponentialBackoff {
            current_interval: base,
            initial_interval: base,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: Duration::from_millis(self.max_delay_ms),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `operation` up to `max_retries + 1` times, sleeping between failures.
///
/// Returns the first success, or the error of the last attempt.
pub async fn with_retry<T, E, F, Fut>(mut operation: F, label: &str, options: RetryOptions) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = options.backoff();
    let mut attempt = 0;
    
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < options.max_retries => {
                let Some(delay) = backoff.next_backoff() else {
                    return Err(e);
                };
                warn!(
                    label,
                    attempt = attempt + 1,
                    "Attempt {} of {} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    options.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(label, attempt = attempt + 1, "All {} attempts failed: {}", attempt + 1, e);
                return Err(e);
            }
        }
    }
}
