//! Bounded exponential-backoff retries around classify-and-decode.
//!
//! Every failed attempt is retried, whatever its cause, until the policy runs
//! out. A failure that was already classified keeps its result when retries
//! are exhausted; anything else becomes `EXHAUSTED_RETIRES`.

use crate::callback::CallContext;
use crate::classify::classify;
use crate::error::{Fault, TransportError};
use crate::response::{failed_response, ApiResponse};
use crate::result::{ApiResult, ApiResultCode};
use crate::transport::{ApiRequest, Transport};
use http::HeaderMap;
use rand::Rng;
use std::time::Duration;

/// The smallest accepted retry delay.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(300);

/// The retry delay used when none (or one below [`MIN_RETRY_DELAY`]) is given.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How many times to retry and how long to wait in between.
///
/// The wait before retry `n` is `retry_delay * 2^(n-1)`, capped at
/// `max_delay`.
///
/// # Examples
///
/// ```
/// use outcall::RetryPolicy;
/// use std::time::Duration;
///
/// // Delays: 500ms, 1s, 2s
/// let policy = RetryPolicy::new(Some(3), Some(Duration::from_millis(500)));
/// assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_secs(2)));
/// assert_eq!(policy.delay_for_attempt(4), None);
///
/// // Negative counts mean no retry; delays below 300ms fall back to 1s.
/// let policy = RetryPolicy::new(Some(-1), Some(Duration::from_millis(10)));
/// assert_eq!(policy.retry_count(), 0);
/// assert_eq!(policy.retry_delay(), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_count: u32,
    retry_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Creates a policy from raw settings.
    ///
    /// A missing or non-positive `retry_count` disables retries. A missing
    /// `retry_delay`, or one shorter than [`MIN_RETRY_DELAY`], becomes
    /// [`DEFAULT_RETRY_DELAY`].
    pub fn new(retry_count: Option<i64>, retry_delay: Option<Duration>) -> Self {
        let retry_count = retry_count
            .filter(|count| *count > 0)
            .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
            .unwrap_or(0);
        let retry_delay = retry_delay
            .filter(|delay| *delay >= MIN_RETRY_DELAY)
            .unwrap_or(DEFAULT_RETRY_DELAY);

        Self {
            retry_count,
            retry_delay,
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(None, None)
    }

    /// Caps the backoff. The cap never drops below the retry delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Scales each delay by a random factor between 50% and 100%, never going
    /// below [`MIN_RETRY_DELAY`].
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the wait before the given retry, or `None` once retries are
    /// exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        if attempt == 0 || attempt > self.retry_count as usize {
            return None;
        }

        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1) as u32);
        let base_delay = self.retry_delay.saturating_mul(multiplier);
        let delay = base_delay.min(self.max_delay.max(self.retry_delay));

        if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
            Some(delay.mul_f64(jitter_factor).max(MIN_RETRY_DELAY))
        } else {
            Some(delay)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Sends `request` and classifies the answer, retrying failed attempts.
///
/// Classified and exhausted failures come back as `R::default()` carrying the
/// failure result. Only faults raised while sending escape as errors; they
/// belong to the error resolver.
pub(crate) async fn send_with_retry<T, R>(
    transport: &T,
    request: &ApiRequest,
    policy: &RetryPolicy,
    context: &CallContext,
) -> Result<R, TransportError>
where
    T: Transport,
    R: ApiResponse,
{
    let mut retries: u32 = 0;

    loop {
        let attempt = context.record_attempt();
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let exchange = transport.send(request).await?;
        let headers = exchange.headers.clone();

        let fault = match classify::<R>(exchange).await {
            Ok(response) => return Ok(response),
            Err(fault) => fault,
        };

        tracing::warn!(
            error = %fault,
            attempt = attempt,
            method = %request.method,
            url = %request.url,
            "Request failed"
        );

        match policy.delay_for_attempt(retries as usize + 1) {
            Some(delay) => {
                tracing::info!(
                    delay_ms = delay.as_millis(),
                    attempt = attempt,
                    "Retrying request after delay"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            None => {
                let result = exhausted_result(fault, retries, headers);
                tracing::warn!(
                    code = result.code(),
                    retries = retries,
                    "Giving up on request"
                );
                return Ok(failed_response(result));
            }
        }
    }
}

/// The result reported once no retry is left.
fn exhausted_result(fault: Fault, retries: u32, headers: HeaderMap) -> ApiResult {
    if let Some(failure) = fault.classified() {
        return failure.result().clone();
    }

    ApiResult::new(ApiResultCode::ExhaustedRetries)
        .with_response_headers(Some(headers))
        .with_failure_message(format!("Retry exhausted after {} retries.", retries))
        .with_failure_detail(fault.to_string())
}
