use rand::Rng;
use std::time::Duration;

use super::classify::FailureKind;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Attempt bookkeeping handed to the failed-attempt observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
    /// 1-based number of the attempt that just failed.
    pub attempt_number: u32,
    /// Attempts still allowed after this one.
    pub attempts_remaining: u32,
}

/// Exponential backoff policy bounded by `[min_delay, max_delay]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Never below 1.
    pub max_attempts: u32,
    /// Delay before the first retry; floor for every delay.
    pub min_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Scale each delay by a random factor in `[1, 2)` before clamping.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_retries(3, Duration::from_millis(500), Duration::from_millis(2000))
    }
}

impl RetryPolicy {
    /// Build a policy from a retry count (re-tries after the first attempt).
    pub fn from_retries(retries: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            min_delay,
            max_delay,
            jitter: false,
        }
    }

    /// Same policy with jitter enabled or disabled.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Effective attempt budget (a zero in config still allows one attempt).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Bookkeeping for the failed attempt `attempt` (1-based).
    pub fn context(&self, attempt: u32) -> RetryContext {
        RetryContext {
            attempt_number: attempt,
            attempts_remaining: self.attempts().saturating_sub(attempt),
        }
    }

    /// Backoff delay after failed attempt `attempt` (1-based).
    ///
    /// `min_delay * 2^(attempt-1)`, optionally jittered, clamped to
    /// `[min_delay, max_delay]`. A `max_delay` below `min_delay` collapses to
    /// `min_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.max_delay.max(self.min_delay);
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        let mut raw = self.min_delay.saturating_mul(exp);
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(1.0..2.0);
            raw = Duration::from_secs_f64(raw.as_secs_f64() * factor);
        }
        raw.clamp(self.min_delay, ceiling)
    }

    /// Compute the next step for a failed attempt.
    ///
    /// `attempt` is 1-based. Only retryable failures with attempts left get
    /// a delay; everything else stops.
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        if kind != FailureKind::Retryable || attempt >= self.attempts() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::from_retries(5, Duration::from_millis(500), Duration::from_millis(2000))
    }

    #[test]
    fn retries_count_excludes_first_attempt() {
        assert_eq!(policy().max_attempts, 6);
        assert_eq!(RetryPolicy::default().max_attempts, 4);
    }

    #[test]
    fn no_retry_for_fatal_or_abort() {
        let p = policy();
        assert_eq!(p.decide(1, FailureKind::Fatal), RetryDecision::NoRetry);
        assert_eq!(p.decide(1, FailureKind::Abort), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(2000));
        assert_eq!(p.backoff(30), Duration::from_millis(2000));
    }

    #[test]
    fn jittered_backoff_stays_in_bounds() {
        let p = policy().with_jitter(true);
        for attempt in 1..20 {
            let d = p.backoff(attempt);
            assert!(d >= p.min_delay && d <= p.max_delay, "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn inverted_bounds_collapse_to_min() {
        let p = RetryPolicy::from_retries(2, Duration::from_millis(300), Duration::from_millis(100));
        assert_eq!(p.backoff(4), Duration::from_millis(300));
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy::from_retries(2, Duration::from_millis(1), Duration::from_millis(5));
        assert!(matches!(
            p.decide(1, FailureKind::Retryable),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, FailureKind::Retryable),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, FailureKind::Retryable), RetryDecision::NoRetry);
    }

    #[test]
    fn context_counts_down() {
        let p = RetryPolicy::from_retries(2, Duration::ZERO, Duration::ZERO);
        assert_eq!(
            p.context(1),
            RetryContext {
                attempt_number: 1,
                attempts_remaining: 2
            }
        );
        assert_eq!(p.context(3).attempts_remaining, 0);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let p = RetryPolicy {
            max_attempts: 0,
            ..policy()
        };
        assert_eq!(p.attempts(), 1);
        assert_eq!(p.decide(1, FailureKind::Retryable), RetryDecision::NoRetry);
    }
}
