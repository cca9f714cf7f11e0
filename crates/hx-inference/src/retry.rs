//! Retry harness: exponential backoff with full jitter, honoring
//! `Retry-After` when the service returns one. Adapted from the teacher's
//! Firestore client retry wrapper to the inference HTTP boundary.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info_span, warn, Instrument};

use crate::error::InferenceError;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn from_env() -> Self {
        Self {
            max_retries: std::env::var("INFERENCE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            base_delay_ms: std::env::var("INFERENCE_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            max_delay_ms: std::env::var("INFERENCE_RETRY_MAX_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
        }
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after: Option<u64>) -> Duration {
    if let Some(secs) = retry_after {
        return Duration::from_secs(secs);
    }
    let exp = config.base_delay_ms.saturating_mul(1 << attempt.min(16));
    let capped = exp.min(config.max_delay_ms);
    let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
    Duration::from_millis(jittered)
}

pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, InferenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InferenceError>>,
{
    let span = info_span!("inference_retry", operation = operation_name);
    async move {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < config.max_retries => {
                    let delay = calculate_delay(config, attempt, e.retry_after_secs());
                    warn!(
                        attempt,
                        max_retries = config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying inference call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_capped_at_max() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 2000,
        };
        for attempt in 0..10 {
            let d = calculate_delay(&config, attempt, None);
            assert!(d.as_millis() as u64 <= config.max_delay_ms);
        }
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let config = RetryConfig::default();
        let d = calculate_delay(&config, 0, Some(30));
        assert_eq!(d, Duration::from_secs(30));
    }
}
