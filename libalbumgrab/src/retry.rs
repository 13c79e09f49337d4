//! Bounded retry of transient network failures.
//!
//! Every network call of the pipeline goes through [`Fetcher`], which re-runs
//! the identical request while it fails with [`AgError::NetworkError`] and the
//! [`RetryPolicy`] still has attempts left. Other errors are returned as is.

use crate::errors::AgError;
use crate::transport::Transport;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const MAX_JITTER: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one. Never below 1.
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Retries immediately, no backoff and no jitter.
    pub fn no_delay(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, 1.0)
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the attempt following `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let jitter_cap = MAX_JITTER.min(self.base_delay).as_millis() as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Runs `op` until it succeeds, fails with a non transient error or the
/// policy runs out of attempts. `target` only names the operation in errors
/// and logs.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    target: &str,
    mut op: F,
) -> Result<T, AgError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if attempt >= policy.max_attempts {
                    tracing::error!("Giving up on {} after {} attempts", target, attempt);
                    return Err(AgError::RetriesExhausted {
                        url: target.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                let delay = policy.delay(attempt);
                tracing::warn!(
                    "Attempt {} for {} failed, retrying in {:?}\nError : {}",
                    attempt,
                    target,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A [`Transport`] with the retry policy applied to every call.
#[derive(Debug, Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn content_type(&self, url: &Url) -> Result<Option<String>, AgError> {
        with_retry(&self.policy, url.as_str(), || self.transport.head(url)).await
    }

    pub async fn text(&self, url: &Url, timeout: Option<Duration>) -> Result<String, AgError> {
        with_retry(&self.policy, url.as_str(), || {
            self.transport.get_text(url, timeout)
        })
        .await
    }

    pub async fn bytes(&self, url: &Url) -> Result<Vec<u8>, AgError> {
        with_retry(&self.policy, url.as_str(), || self.transport.get_bytes(url)).await
    }
}
