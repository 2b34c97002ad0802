//! Tests for the retry executor.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::control::{CancelSignal, DEFAULT_ABORT_MESSAGE};

use super::{run_with_retry, Classify, FailureKind, Retry, RetryContext, RetryError, RetryPolicy};

#[derive(Debug)]
struct TestError {
    kind: FailureKind,
    msg: &'static str,
}

impl TestError {
    fn retryable(msg: &'static str) -> Self {
        Self {
            kind: FailureKind::Retryable,
            msg,
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for TestError {}

impl Classify for TestError {
    fn failure_kind(&self) -> FailureKind {
        self.kind
    }
}

fn fast_policy(retries: u32) -> RetryPolicy {
    RetryPolicy::from_retries(retries, Duration::from_millis(1), Duration::from_millis(4))
}

#[tokio::test]
async fn always_retryable_runs_exactly_max_attempts() {
    let calls = AtomicU32::new(0);
    let policy = fast_policy(3);
    let res: Result<(), _> = run_with_retry(&policy, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(TestError::retryable("fetch failed")) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    match res {
        Err(RetryError::Exhausted { attempts, source }) => {
            assert_eq!(attempts, 4);
            assert_eq!(source.msg, "fetch failed");
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn first_success_short_circuits() {
    let calls = AtomicU32::new(0);
    let policy = fast_policy(5);
    let res = run_with_retry(&policy, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(TestError::retryable("server error"))
            } else {
                Ok(n)
            }
        }
    })
    .await;

    assert_eq!(res.unwrap(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fatal_on_first_attempt_stops_without_delay() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::from_retries(5, Duration::from_secs(10), Duration::from_secs(10));
    let started = Instant::now();
    let res: Result<(), _> = run_with_retry(&policy, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async {
            Err(TestError {
                kind: FailureKind::Fatal,
                msg: "bad form",
            })
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(res, Err(RetryError::Fatal { attempt: 1, .. })));
}

#[tokio::test]
async fn abort_error_stops_and_surfaces_cause() {
    let calls = AtomicU32::new(0);
    let policy = fast_policy(5);
    let res: Result<(), _> = run_with_retry(&policy, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 2 {
                Err(TestError {
                    kind: FailureKind::Abort,
                    msg: "credentials revoked",
                })
            } else {
                Err(TestError::retryable("timeout"))
            }
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let err = res.unwrap_err();
    assert!(matches!(err, RetryError::Aborted(_)));
    assert_eq!(err.into_source().unwrap().msg, "credentials revoked");
}

#[tokio::test]
async fn cancelled_before_first_attempt_never_invokes() {
    let calls = AtomicU32::new(0);
    let signal = CancelSignal::new();
    signal.cancel_default();
    let res: Result<(), RetryError<TestError>> = Retry::new(&fast_policy(3))
        .cancel_on(Some(&signal))
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    match res {
        Err(RetryError::Cancelled(reason)) => assert_eq!(reason, DEFAULT_ABORT_MESSAGE),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_between_attempts_skips_next_attempt_and_observer() {
    let calls = AtomicU32::new(0);
    let observed = AtomicU32::new(0);
    let signal = CancelSignal::new();
    let res: Result<(), _> = Retry::new(&fast_policy(5))
        .cancel_on(Some(&signal))
        .on_failed_attempt(|_: &TestError, _| {
            observed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            signal.cancel("build interrupted");
            async { Err(TestError::retryable("connection reset")) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(observed.load(Ordering::SeqCst), 0);
    match res {
        Err(RetryError::Cancelled(reason)) => assert_eq!(reason, "build interrupted"),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_interrupts_backoff_wait() {
    let calls = AtomicU32::new(0);
    let signal = CancelSignal::new();
    let canceller = signal.clone();
    let policy = RetryPolicy::from_retries(3, Duration::from_secs(30), Duration::from_secs(30));
    let started = Instant::now();
    let res: Result<(), _> = Retry::new(&policy)
        .cancel_on(Some(&signal))
        .on_failed_attempt(move |_: &TestError, _| {
            canceller.cancel_default();
            Ok(())
        })
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::retryable("503")) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(res.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn observer_sees_attempt_context() {
    let seen: Mutex<Vec<RetryContext>> = Mutex::new(Vec::new());
    let res: Result<(), _> = Retry::new(&fast_policy(2))
        .on_failed_attempt(|_: &TestError, ctx| {
            seen.lock().unwrap().push(ctx);
            Ok(())
        })
        .run(|| async { Err(TestError::retryable("flaky")) })
        .await;

    assert!(matches!(res, Err(RetryError::Exhausted { attempts: 3, .. })));
    let seen = seen.into_inner().unwrap();
    assert_eq!(
        seen,
        vec![
            RetryContext {
                attempt_number: 1,
                attempts_remaining: 2
            },
            RetryContext {
                attempt_number: 2,
                attempts_remaining: 1
            },
        ]
    );
}

#[tokio::test]
async fn failing_observer_aborts_run() {
    let calls = AtomicU32::new(0);
    let res: Result<(), _> = Retry::new(&fast_policy(5))
        .on_failed_attempt(|_: &TestError, _| Err(anyhow::anyhow!("stop here")))
        .run(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::retryable("flaky")) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match res {
        Err(RetryError::Observer(e)) => assert_eq!(e.to_string(), "stop here"),
        other => panic!("expected observer failure, got {other:?}"),
    }
}

async fn explode() -> Result<(), TestError> {
    panic!("unexpected sourcemap shape")
}

#[tokio::test]
async fn panic_becomes_fatal_with_payload_in_message() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let res: Result<(), RetryError<TestError>> = run_with_retry(&fast_policy(3), || {
        counter.fetch_add(1, Ordering::SeqCst);
        explode()
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let err = res.unwrap_err();
    assert!(matches!(err, RetryError::Panicked(_)));
    let msg = err.to_string();
    assert!(msg.contains("Non-error was thrown"), "{msg}");
    assert!(msg.contains("unexpected sourcemap shape"), "{msg}");
}

#[tokio::test]
async fn backoff_delays_stay_within_bounds() {
    let policy = RetryPolicy::from_retries(4, Duration::from_millis(5), Duration::from_millis(20))
        .with_jitter(true);
    let stamps: Mutex<Vec<Instant>> = Mutex::new(Vec::new());
    let _ = run_with_retry(&policy, || {
        stamps.lock().unwrap().push(Instant::now());
        async { Err::<(), _>(TestError::retryable("flaky")) }
    })
    .await;

    let stamps = stamps.into_inner().unwrap();
    assert_eq!(stamps.len(), 5);
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= policy.min_delay);
    }
}
