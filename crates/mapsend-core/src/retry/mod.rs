//! Retry and backoff executor.
//!
//! This module wraps a unit of async work, retries it with bounded
//! exponential backoff, and separates permanent failures (fatal, abort) from
//! transient ones. Errors carry their own failure kind via `Classify`, so the
//! executor never inspects messages.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{AttemptOutcome, Classify, FailureKind};
pub use error::RetryError;
pub use policy::{RetryContext, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Retry};

#[cfg(test)]
mod tests;
