//! Cooperative cancellation for retrying operations.
//!
//! A `CancelSignal` is shared between whoever may stop the run (the CLI's
//! Ctrl-C handler, a test) and the retry executor. The executor checks it at
//! attempt boundaries and races it against backoff waits; an attempt already
//! in flight is always allowed to finish.

use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Message used when a signal is cancelled without a reason.
pub const DEFAULT_ABORT_MESSAGE: &str = "The operation was aborted.";

/// Error returned when an operation is stopped by a cancel signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationAborted {
    pub reason: String,
}

impl std::fmt::Display for OperationAborted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for OperationAborted {}

/// Cloneable cancel handle carrying an optional reason.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel with a reason. The first reason wins if called more than once.
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    /// Cancel without a reason; observers see `DEFAULT_ABORT_MESSAGE`.
    pub fn cancel_default(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The error an aborted operation should report.
    pub fn abort_error(&self) -> OperationAborted {
        let reason = self
            .reason
            .get()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ABORT_MESSAGE.to_string());
        OperationAborted { reason }
    }
}
