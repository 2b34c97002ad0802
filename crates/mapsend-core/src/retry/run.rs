//! Retry loop: run an async operation until success or the policy says stop.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::control::CancelSignal;

use super::classify::{AttemptOutcome, Classify, FailureKind};
use super::error::RetryError;
use super::policy::{RetryContext, RetryDecision, RetryPolicy};

type Observer<'a, E> = Box<dyn FnMut(&E, RetryContext) -> anyhow::Result<()> + Send + 'a>;

/// Configured retry run. Build with `Retry::new`, optionally attach an
/// observer and a cancel signal, then `run` the operation.
pub struct Retry<'a, E> {
    policy: RetryPolicy,
    observer: Option<Observer<'a, E>>,
    cancel: Option<&'a CancelSignal>,
}

impl<'a, E: Classify> Retry<'a, E> {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            policy: *policy,
            observer: None,
            cancel: None,
        }
    }

    /// Called after each retryable failure that will be retried, before the
    /// backoff wait. Returning an error stops the run with that error.
    pub fn on_failed_attempt<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&E, RetryContext) -> anyhow::Result<()> + Send + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn cancel_on(mut self, signal: Option<&'a CancelSignal>) -> Self {
        self.cancel = signal;
        self
    }

    fn cancelled(&self) -> Option<RetryError<E>> {
        self.cancel
            .filter(|s| s.is_cancelled())
            .map(|s| RetryError::Cancelled(s.abort_error().reason))
    }

    /// Runs `operation` up to `policy.max_attempts` times.
    ///
    /// A completed attempt is never discarded: a success is returned even if
    /// the signal fired while it was in flight.
    pub async fn run<T, F, Fut>(mut self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1u32;
        loop {
            if let Some(err) = self.cancelled() {
                return Err(err);
            }

            let result = match AssertUnwindSafe(async { operation().await })
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(payload) => return Err(RetryError::Panicked(panic_message(payload))),
            };

            let error = match AttemptOutcome::from_result(result) {
                AttemptOutcome::Success(value) => return Ok(value),
                AttemptOutcome::Aborted(e) => return Err(RetryError::Aborted(e)),
                AttemptOutcome::FatalFailure(e) => {
                    return Err(RetryError::Fatal { attempt, source: e })
                }
                AttemptOutcome::RetryableFailure(e) => e,
            };

            if let Some(err) = self.cancelled() {
                return Err(err);
            }

            let delay = match self.policy.decide(attempt, FailureKind::Retryable) {
                RetryDecision::NoRetry => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: error,
                    })
                }
                RetryDecision::RetryAfter(d) => d,
            };

            let ctx = self.policy.context(attempt);
            if let Some(observer) = self.observer.as_mut() {
                if let Err(e) = observer(&error, ctx) {
                    return Err(RetryError::Observer(e));
                }
            }
            tracing::debug!(
                attempt = ctx.attempt_number,
                remaining = ctx.attempts_remaining,
                delay_ms = delay.as_millis() as u64,
                "attempt failed, backing off"
            );

            match self.cancel {
                Some(signal) => {
                    tokio::select! {
                        _ = signal.cancelled() => {
                            return Err(RetryError::Cancelled(signal.abort_error().reason));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }
}

/// Runs `operation` with `policy`, no observer and no cancel signal.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, RetryError<E>>
where
    E: Classify,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retry::new(policy).run(operation).await
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
