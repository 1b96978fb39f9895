//! Page-load waiter (`waitForPageToLoad`, and the implicit wait after `open`).
//!
//! # Responsibilities
//! - Poll `document.readyState` until it reads `complete`
//! - Require the page to stay `complete` for a settle period before succeeding
//!
//! # Design Decisions
//! - Evaluation failures count as "not loaded yet": a navigation tears down the script context
//! - Any non-`complete` observation or failure resets the settle clock (redirects, reloads)

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::waiter::{BoxError, PredicateFailure, Probe, WaitError, WaitOptions, Waiter};
use crate::browser::{BrowserSession, ReadyState};

pub const DEFAULT_SETTLE_MS: u64 = 100;

/// Tracks how long the page has continuously reported `complete`.
#[derive(Debug, Clone)]
pub struct SettleClock {
    settle: Duration,
    complete_since: Option<Instant>,
}

impl SettleClock {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            complete_since: None,
        }
    }

    /// Record one observation; true once `complete` has held for the settle period.
    pub fn observe(&mut self, complete: bool, now: Instant) -> bool {
        if !complete {
            self.complete_since = None;
            return false;
        }
        let since = *self.complete_since.get_or_insert(now);
        now.saturating_duration_since(since) >= self.settle
    }

    pub fn reset(&mut self) {
        self.complete_since = None;
    }
}

struct PageLoadProbe {
    browser: Arc<dyn BrowserSession>,
    clock: SettleClock,
}

#[async_trait]
impl Probe for PageLoadProbe {
    type Output = ();

    async fn check(&mut self) -> Result<Option<()>, BoxError> {
        match self.browser.ready_state().await {
            Ok(state) => Ok(self
                .clock
                .observe(state == ReadyState::Complete, Instant::now())
                .then_some(())),
            Err(e) => {
                self.clock.reset();
                Err(e.into())
            }
        }
    }
}

pub struct PageLoadWaiter {
    browser: Arc<dyn BrowserSession>,
    waiter: Waiter,
    settle: Duration,
}

impl PageLoadWaiter {
    pub fn new(browser: Arc<dyn BrowserSession>, options: WaitOptions) -> Self {
        Self {
            browser,
            waiter: Waiter::new(options)
                .kind("page_load")
                .on_predicate_failure(PredicateFailure::Retry),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.waiter = self.waiter.with_cancellation(token);
        self
    }

    pub async fn wait(&self) -> Result<(), WaitError> {
        let mut probe = PageLoadProbe {
            browser: self.browser.clone(),
            clock: SettleClock::new(self.settle),
        };
        self.waiter.poll("page did not finish loading", &mut probe).await
    }
}
