//! # Retry Executor
//!
//! Wraps one logical request in bounded exponential backoff.
//!
//! ## Classification
//!
//! | Outcome                         | Disposition                               |
//! |---------------------------------|-------------------------------------------|
//! | 2xx (including 204)             | success, returned immediately             |
//! | 429                             | retryable, waits for `Retry-After` if set |
//! | 5xx, timeout, connection error  | retryable, exponential backoff            |
//! | other 4xx                       | terminal, typed (`NotFound`, ...)         |
//!
//! A `Retry-After` hint is waited out in full, even past `max_delay`. A hint of zero, or a date
//! already past, falls back to exponential backoff.
//!
//! After the attempt budget is spent the last retryable error is wrapped in
//! [`ReconcileError::MaxRetriesExceeded`] together with the attempt count, the last status and
//! the total time spent waiting.
//!
//! ## Cancellation
//!
//! Both the request and the backoff sleep race against a [`CancellationToken`]. Cancellation
//! returns [`ReconcileError::Cancelled`] at once; it is never turned into a retry or a success.

use crate::framework::error::{ReconcileError, TransportError};
use crate::framework::transport::HttpResponse;
use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const RETRY_AFTER: &str = "retry-after";

/// Attempt budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Terminal,
    Exhausted,
}

/// The executor's verdict for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub attempt: u32,
    pub wait: Duration,
    pub disposition: Disposition,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Classifies the failure of attempt `attempt` (1-based).
    pub fn decide(&self, attempt: u32, error: &ReconcileError) -> RetryDecision {
        let disposition = if !error.is_retryable() {
            Disposition::Terminal
        } else if attempt >= self.max_attempts {
            Disposition::Exhausted
        } else {
            Disposition::Retry
        };
        let wait = match disposition {
            Disposition::Retry => error
                .retry_after()
                .unwrap_or_else(|| self.backoff(attempt)),
            _ => Duration::ZERO,
        };
        RetryDecision {
            attempt,
            wait,
            disposition,
        }
    }
}

/// A successful exchange and what it took to get it.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub response: HttpResponse,
    pub attempts: u32,
    pub waited: Duration,
}

/// Runs requests under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Calls `op` until it succeeds, fails terminally, runs out of attempts or is cancelled.
    ///
    /// `resource` names the target in every error message.
    pub async fn execute<F, Fut>(
        &self,
        resource: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<RetryOutcome, ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse, TransportError>>,
    {
        let mut waited = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(resource, "request")),
                result = op() => result,
            };

            let error = match result {
                Ok(response) if response.is_success() => {
                    debug!(resource, attempt, status = response.status, "Request ok");
                    return Ok(RetryOutcome {
                        response,
                        attempts: attempt,
                        waited,
                    });
                }
                Ok(response) => error_from_response(resource, &response),
                Err(source) => ReconcileError::Transport {
                    resource: resource.to_string(),
                    source,
                },
            };

            let decision = self.policy.decide(attempt, &error);
            match decision.disposition {
                Disposition::Terminal => return Err(error),
                Disposition::Exhausted => {
                    warn!(resource, attempts = attempt, ?waited, error = %error, "Retries exhausted");
                    return Err(ReconcileError::MaxRetriesExceeded {
                        resource: resource.to_string(),
                        attempts: attempt,
                        last_status: error.status(),
                        waited,
                        source: Box::new(error),
                    });
                }
                Disposition::Retry => {
                    warn!(
                        resource,
                        attempt,
                        status = error.status(),
                        wait_ms = decision.wait.as_millis() as u64,
                        "Retrying"
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(resource, "backoff")),
                _ = tokio::time::sleep(decision.wait) => {}
            }
            waited += decision.wait;
        }
    }
}

fn cancelled(resource: &str, during: &'static str) -> ReconcileError {
    debug!(resource, during, "Cancelled");
    ReconcileError::Cancelled {
        resource: resource.to_string(),
        during,
    }
}

fn error_from_response(resource: &str, response: &HttpResponse) -> ReconcileError {
    let retry_after = if response.status == 429 {
        response
            .header(RETRY_AFTER)
            .and_then(|value| parse_retry_after(value, OffsetDateTime::now_utc()))
    } else {
        None
    };
    ReconcileError::from_status(resource, response.status, retry_after, &response.body)
}

/// Parses a `Retry-After` value: delay-seconds or an IMF-fixdate relative to `now`.
///
/// Zero and past dates yield `None` so the caller backs off instead of hammering the server.
pub fn parse_retry_after(value: &str, now: OffsetDateTime) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return (seconds > 0).then(|| Duration::from_secs(seconds));
    }

    let format = time::format_description::parse(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT",
    )
    .ok()?;
    let at = time::PrimitiveDateTime::parse(value, &format).ok()?.assume_utc();
    Duration::try_from(at - now).ok().filter(|wait| !wait.is_zero())
}
