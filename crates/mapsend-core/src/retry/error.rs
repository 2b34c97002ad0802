//! Terminal error of a retried operation.

use std::fmt;

/// Why `run_with_retry` gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; holds the last one.
    Exhausted { attempts: u32, source: E },
    /// A fatal error stopped the run on the given attempt.
    Fatal { attempt: u32, source: E },
    /// The operation returned an abort-tagged error; holds its cause.
    Aborted(E),
    /// The failed-attempt observer returned an error.
    Observer(anyhow::Error),
    /// The cancel signal fired; holds the cancellation reason.
    Cancelled(String),
    /// The operation panicked; holds the rendered payload.
    Panicked(String),
}

impl<E> RetryError<E> {
    /// The operation's own error, if the run ended on one.
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { source, .. }
            | RetryError::Fatal { source, .. }
            | RetryError::Aborted(source) => Some(source),
            RetryError::Observer(_) | RetryError::Cancelled(_) | RetryError::Panicked(_) => None,
        }
    }

    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. }
            | RetryError::Fatal { source, .. }
            | RetryError::Aborted(source) => Some(source),
            RetryError::Observer(_) | RetryError::Cancelled(_) | RetryError::Panicked(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled(_))
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, source } => {
                write!(f, "{} (gave up after {} attempts)", source, attempts)
            }
            RetryError::Fatal { source, .. } => write!(f, "{}", source),
            RetryError::Aborted(source) => write!(f, "{}", source),
            RetryError::Observer(e) => write!(f, "retry observer failed: {:#}", e),
            RetryError::Cancelled(reason) => write!(f, "{}", reason),
            RetryError::Panicked(payload) => write!(
                f,
                "Non-error was thrown: \"{}\". Operations should return errors, not panic.",
                payload
            ),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Exhausted { source, .. }
            | RetryError::Fatal { source, .. }
            | RetryError::Aborted(source) => Some(source),
            RetryError::Observer(e) => Some(&**e),
            RetryError::Cancelled(_) | RetryError::Panicked(_) => None,
        }
    }
}
