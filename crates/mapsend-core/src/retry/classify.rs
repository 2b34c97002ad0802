//! Failure kinds and per-attempt outcome classification.

/// High-level classification of an error for retry purposes.
///
/// Assigned where the error is produced (HTTP status, curl error, local I/O)
/// rather than derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient: network trouble, non-2xx response. Eligible for another attempt.
    Retryable,
    /// Contract or framing error that another attempt cannot fix.
    Fatal,
    /// The operation asked to stop; surface its cause without retrying.
    Abort,
}

/// Errors that know their own failure kind.
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;
}

/// Tagged result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    Success(T),
    RetryableFailure(E),
    FatalFailure(E),
    Aborted(E),
}

impl<T, E: Classify> AttemptOutcome<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => AttemptOutcome::Success(value),
            Err(e) => match e.failure_kind() {
                FailureKind::Retryable => AttemptOutcome::RetryableFailure(e),
                FailureKind::Fatal => AttemptOutcome::FatalFailure(e),
                FailureKind::Abort => AttemptOutcome::Aborted(e),
            },
        }
    }
}
