//! Popup waiter (`waitForPopUp`).
//!
//! # Responsibilities
//! - Wait for a window matching a target to exist and leave `about:blank`
//! - Support the "any new window" target (`null`, `_blank` or empty)
//!
//! # Design Decisions
//! - Window-list and location failures are swallowed: the window may still be opening
//! - "Any new window" means any handle absent from the first window list that could be read

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::waiter::{BoxError, PredicateFailure, Probe, WaitError, WaitOptions, Waiter};
use crate::browser::{BrowserSession, BLANK_LOCATION};

/// Which window a popup wait is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupTarget {
    /// Window handle or `window.name`.
    Named(String),
    /// Any window opened after the wait began.
    AnyNew,
}

impl PopupTarget {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "null" | "_blank" => PopupTarget::AnyNew,
            name => PopupTarget::Named(name.to_string()),
        }
    }
}

struct PopupProbe {
    browser: Arc<dyn BrowserSession>,
    target: PopupTarget,
    /// Handles that existed before the wait; `None` until a listing succeeds.
    baseline: Option<HashSet<String>>,
}

#[async_trait]
impl Probe for PopupProbe {
    type Output = String;

    async fn check(&mut self) -> Result<Option<String>, BoxError> {
        let windows = self.browser.windows().await?;
        if self.target == PopupTarget::AnyNew && self.baseline.is_none() {
            self.baseline = Some(windows.into_iter().map(|w| w.handle).collect());
            return Ok(None);
        }

        let baseline = self.baseline.as_ref();
        let candidates = windows.into_iter().filter(|w| match &self.target {
            PopupTarget::Named(name) => w.answers_to(name),
            PopupTarget::AnyNew => !baseline.is_some_and(|b| b.contains(&w.handle)),
        });

        for window in candidates {
            let location = self.browser.window_location(&window.handle).await?;
            if !location.is_empty() && location != BLANK_LOCATION {
                return Ok(Some(window.handle));
            }
        }
        Ok(None)
    }
}

pub struct PopupWaiter {
    browser: Arc<dyn BrowserSession>,
    waiter: Waiter,
}

impl PopupWaiter {
    pub fn new(browser: Arc<dyn BrowserSession>, options: WaitOptions) -> Self {
        Self {
            browser,
            waiter: Waiter::new(options)
                .kind("popup")
                .on_predicate_failure(PredicateFailure::Retry),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.waiter = self.waiter.with_cancellation(token);
        self
    }

    /// Wait for the popup and return its handle.
    pub async fn wait(&self, target: &PopupTarget) -> Result<String, WaitError> {
        let baseline = match target {
            PopupTarget::AnyNew => match self.browser.windows().await {
                Ok(windows) => Some(windows.into_iter().map(|w| w.handle).collect()),
                Err(e) => {
                    tracing::debug!(error = %e, "Window list unavailable, baseline deferred");
                    None
                }
            },
            PopupTarget::Named(_) => None,
        };

        let message = match target {
            PopupTarget::Named(name) => format!("popup window `{}` did not load", name),
            PopupTarget::AnyNew => "no new popup window loaded".to_string(),
        };

        let mut probe = PopupProbe {
            browser: self.browser.clone(),
            target: target.clone(),
            baseline,
        };
        self.waiter.poll(&message, &mut probe).await
    }
}
