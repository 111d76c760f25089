//! Bounded retries around a single instrument fetch.
//!
//! The policy never inspects vendor messages itself: every failure is mapped through
//! [`ProviderError::class`] and the [`ErrorClass`] alone decides whether to wait and
//! try again, stop quietly, or stop and record an error entry.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::providers::{ErrorClass, ProviderError};
use crate::utils::pause::Pause;

/// How a fetch ended after the policy gave up or succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    /// The operation returned data.
    Success(T),
    /// The provider has nothing for the window.
    NoData,
    /// The provider refused the request. Skipped without an error entry.
    Rejected,
    /// A non-retriable failure, with the underlying message.
    Failed(String),
    /// Every attempt hit a busy upstream; carries the last message.
    Exhausted(String),
}

/// The final attempt number together with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt<T> {
    pub attempt: u32,
    pub outcome: AttemptOutcome<T>,
}

impl<T> FetchAttempt<T> {
    pub fn into_success(self) -> Option<T> {
        match self.outcome {
            AttemptOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Entry for the batch error list, if this outcome is reported.
    pub fn error_entry(&self, instrument: &str) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Success(_) | AttemptOutcome::Rejected => None,
            AttemptOutcome::NoData => Some(format!("no data for {instrument}")),
            AttemptOutcome::Failed(message) => {
                Some(format!("failed to fetch {instrument}: {message}"))
            }
            AttemptOutcome::Exhausted(message) => Some(format!(
                "gave up on {instrument} after {} attempts: {message}",
                self.attempt
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
}

impl RetryPolicy {
    /// `retry` is the total number of attempts; `0` is treated as `1`.
    pub fn new(retry: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: retry.max(1),
            retry_delay,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds or the policy stops.
    ///
    /// Only upstream-busy failures are retried, each after `retry_delay`. There is no
    /// wait after the last attempt.
    pub async fn attempt<T, F, Fut>(
        &self,
        instrument: &str,
        pause: &dyn Pause,
        mut operation: F,
    ) -> FetchAttempt<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            info!(
                instrument,
                attempt,
                max_attempts = self.max_attempts,
                "fetching instrument"
            );

            let err = match operation().await {
                Ok(value) => {
                    debug!(instrument, attempt, "fetch succeeded");
                    return FetchAttempt {
                        attempt,
                        outcome: AttemptOutcome::Success(value),
                    };
                }
                Err(err) => err,
            };

            let outcome = match err.class() {
                ErrorClass::NoData => {
                    warn!(instrument, "no data for the requested window");
                    AttemptOutcome::NoData
                }
                ErrorClass::RequestRejected => {
                    warn!(instrument, error = %err, "request rejected, skipping instrument");
                    AttemptOutcome::Rejected
                }
                ErrorClass::Other => {
                    error!(instrument, error = %err, "fetch failed");
                    AttemptOutcome::Failed(err.to_string())
                }
                ErrorClass::UpstreamBusy if attempt >= self.max_attempts => {
                    error!(instrument, attempt, error = %err, "upstream still busy, giving up");
                    AttemptOutcome::Exhausted(err.to_string())
                }
                ErrorClass::UpstreamBusy => {
                    warn!(
                        instrument,
                        attempt,
                        delay_secs = self.retry_delay.as_secs(),
                        error = %err,
                        "upstream busy, retrying"
                    );
                    pause.pause(self.retry_delay).await;
                    attempt += 1;
                    continue;
                }
            };

            return FetchAttempt { attempt, outcome };
        }
    }
}
