//! Cooperative condition polling.
//!
//! # Responsibilities
//! - Evaluate a probe until it yields a value, the deadline passes, or the caller cancels
//! - Decide per waiter whether probe failures abort the wait or count as "not yet"
//! - Report timeouts as a distinct error carrying the caller's message
//!
//! # State Transitions
//! ```text
//! Running → Satisfied: probe yields a value
//! Running → TimedOut:  elapsed >= timeout after a failed check
//! Running → Cancelled: cancellation token fires (checked before each probe and during sleeps)
//! Running → Failed:    probe errors under PredicateFailure::Propagate
//! ```
//!
//! # Design Decisions
//! - Runs on the caller's task; no thread is spawned or aborted
//! - Probes are evaluated strictly one after another
//! - The final sleep is clamped to the remaining budget so the deadline check is on time
//! - A blocking variant exists for callers already on a dedicated worker thread

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_INTERVAL_MS: u64 = 500;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a waiter does when its probe fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredicateFailure {
    /// Abort the wait with [`WaitError::Predicate`].
    #[default]
    Propagate,
    /// Treat the failure as "not yet" and keep polling.
    Retry,
}

/// Wait bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_millis(DEFAULT_TIMEOUT_MS, DEFAULT_INTERVAL_MS)
    }
}

impl WaitOptions {
    pub fn from_millis(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("{message} (timed out after {}ms)", .elapsed.as_millis())]
    TimedOut {
        message: String,
        elapsed: Duration,
        /// Most recent swallowed probe failure, if any.
        last_error: Option<String>,
    },
    #[error("{message}: {source}")]
    Predicate {
        message: String,
        #[source]
        source: BoxError,
    },
    #[error("{message} (cancelled)")]
    Cancelled { message: String },
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::TimedOut { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            WaitError::TimedOut { message, .. }
            | WaitError::Predicate { message, .. }
            | WaitError::Cancelled { message } => message,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            WaitError::TimedOut { .. } => "timed_out",
            WaitError::Predicate { .. } => "failed",
            WaitError::Cancelled { .. } => "cancelled",
        }
    }
}

/// One check of a waited-for condition.
///
/// `Ok(Some(v))` ends the wait with `v`, `Ok(None)` means "not yet".
#[async_trait]
pub trait Probe: Send {
    type Output: Send;

    async fn check(&mut self) -> Result<Option<Self::Output>, BoxError>;
}

type CheckFn<'a, T> = Box<dyn FnMut() -> BoxFuture<'static, Result<Option<T>, BoxError>> + Send + 'a>;

/// Closure-backed probe behind [`Waiter::until`] and [`Waiter::until_some`].
///
/// The closure and its futures are type-erased so a waiting future stays `Send`
/// when it borrows from the caller.
struct Checked<'a, T>(CheckFn<'a, T>);

#[async_trait]
impl<T: Send + 'static> Probe for Checked<'_, T> {
    type Output = T;

    async fn check(&mut self) -> Result<Option<T>, BoxError> {
        (self.0)().await
    }
}

/// A configured polling operation.
#[derive(Debug, Clone)]
pub struct Waiter {
    kind: &'static str,
    options: WaitOptions,
    on_failure: PredicateFailure,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(options: WaitOptions) -> Self {
        Self {
            kind: "generic",
            options,
            on_failure: PredicateFailure::Propagate,
            cancel: CancellationToken::new(),
        }
    }

    /// Label used in logs and the `hub_waits_total` metric.
    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    pub fn on_predicate_failure(mut self, policy: PredicateFailure) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> WaitOptions {
        self.options
    }

    /// Wait until `predicate` returns `Ok(true)`.
    pub async fn until<F, Fut, E>(&self, message: &str, mut predicate: F) -> Result<(), WaitError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let mut probe: Checked<'_, ()> = Checked(Box::new(move || {
            let check = predicate();
            async move {
                match check.await {
                    Ok(done) => Ok(done.then_some(())),
                    Err(e) => Err(e.into()),
                }
            }
            .boxed()
        }));
        self.poll(message, &mut probe).await
    }

    /// Wait until `lookup` returns `Ok(Some(value))` and hand the value back.
    pub async fn until_some<F, Fut, T, E>(&self, message: &str, mut lookup: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let mut probe: Checked<'_, T> = Checked(Box::new(move || {
            let check = lookup();
            async move { check.await.map_err(Into::into) }.boxed()
        }));
        self.poll(message, &mut probe).await
    }

    /// Drive `probe` to completion.
    pub async fn poll<P: Probe>(&self, message: &str, probe: &mut P) -> Result<P::Output, WaitError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_error: Option<String> = None;

        let result = loop {
            if self.cancel.is_cancelled() {
                break Err(WaitError::Cancelled { message: message.to_string() });
            }

            attempts += 1;
            match probe.check().await {
                Ok(Some(value)) => break Ok(value),
                Ok(None) => {}
                Err(source) => match self.on_failure {
                    PredicateFailure::Propagate => {
                        break Err(WaitError::Predicate {
                            message: message.to_string(),
                            source,
                        });
                    }
                    PredicateFailure::Retry => {
                        tracing::debug!(kind = self.kind, attempt = attempts, error = %source, "Probe failed, retrying");
                        last_error = Some(source.to_string());
                    }
                },
            }

            let elapsed = started.elapsed();
            if elapsed >= self.options.timeout {
                break Err(WaitError::TimedOut {
                    message: message.to_string(),
                    elapsed,
                    last_error: last_error.take(),
                });
            }

            let pause = self.options.interval.min(self.options.timeout - elapsed);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.cancel.cancelled() => {
                    break Err(WaitError::Cancelled { message: message.to_string() });
                }
            }
        };

        self.finish(&result, attempts, started.elapsed());
        result
    }

    /// Blocking variant of [`Waiter::until`] for dedicated worker threads.
    ///
    /// Cancellation is observed between checks, not during a sleep.
    pub fn until_blocking<F, E>(&self, message: &str, mut predicate: F) -> Result<(), WaitError>
    where
        F: FnMut() -> Result<bool, E>,
        E: Into<BoxError>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_error: Option<String> = None;

        let result = loop {
            if self.cancel.is_cancelled() {
                break Err(WaitError::Cancelled { message: message.to_string() });
            }

            attempts += 1;
            match predicate() {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(e) => {
                    let source: BoxError = e.into();
                    if self.on_failure == PredicateFailure::Propagate {
                        break Err(WaitError::Predicate {
                            message: message.to_string(),
                            source,
                        });
                    }
                    last_error = Some(source.to_string());
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.options.timeout {
                break Err(WaitError::TimedOut {
                    message: message.to_string(),
                    elapsed,
                    last_error: last_error.take(),
                });
            }
            std::thread::sleep(self.options.interval.min(self.options.timeout - elapsed));
        };

        self.finish(&result, attempts, started.elapsed());
        result
    }

    fn finish<T>(&self, result: &Result<T, WaitError>, attempts: u32, elapsed: Duration) {
        let outcome = match result {
            Ok(_) => "satisfied",
            Err(e) => e.outcome(),
        };
        tracing::debug!(
            kind = self.kind,
            outcome,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "Wait finished"
        );
        metrics::record_wait(self.kind, outcome, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> WaitOptions {
        WaitOptions::from_millis(1_000, 10)
    }

    #[tokio::test]
    async fn test_returns_on_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let waiter = Waiter::new(fast());

        waiter
            .until("ready", move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(true)
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_carries_message_and_last_error() {
        let waiter = Waiter::new(WaitOptions::from_millis(50, 10))
            .on_predicate_failure(PredicateFailure::Retry);

        let err = waiter
            .until("page never settled", || async { Err::<bool, _>("context destroyed".to_string()) })
            .await
            .unwrap_err();

        match err {
            WaitError::TimedOut { message, last_error, .. } => {
                assert_eq!(message, "page never settled");
                assert_eq!(last_error.as_deref(), Some("context destroyed"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_propagate_stops_on_first_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let waiter = Waiter::new(fast());

        let err = waiter
            .until("condition", move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<bool, _>("boom".to_string())
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Predicate { .. }));
        assert!(!err.is_timeout());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_until_some_returns_value() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let waiter = Waiter::new(fast());

        let value = waiter
            .until_some("lookup", move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>((n >= 2).then_some(n * 10))
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 20);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep() {
        let token = CancellationToken::new();
        let waiter = Waiter::new(WaitOptions::from_millis(10_000, 5_000)).with_cancellation(token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = waiter
            .until("never", || async { Ok::<_, BoxError>(false) })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_probes() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let err = Waiter::new(fast())
            .with_cancellation(token)
            .until("never", move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(true)
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blocking_variant() {
        let mut calls = 0;
        let waiter = Waiter::new(WaitOptions::from_millis(1_000, 5))
            .on_predicate_failure(PredicateFailure::Retry);

        waiter
            .until_blocking("blocking", || {
                calls += 1;
                match calls {
                    1 => Err("not yet".to_string()),
                    2 => Ok(false),
                    _ => Ok(true),
                }
            })
            .unwrap();

        assert_eq!(calls, 3);
    }

    #[test]
    fn test_blocking_timeout() {
        let waiter = Waiter::new(WaitOptions::from_millis(30, 10));
        let err = waiter
            .until_blocking("never", || Ok::<_, BoxError>(false))
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.message(), "never");
    }
}
