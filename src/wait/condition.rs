//! Script condition waiter (`waitForCondition`).

use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::waiter::{PredicateFailure, WaitError, WaitOptions, Waiter};
use crate::browser::{BrowserError, BrowserSession};

/// Polls a boolean script expression. Script failures end the wait.
pub struct ConditionWaiter {
    browser: Arc<dyn BrowserSession>,
    waiter: Waiter,
}

impl ConditionWaiter {
    pub fn new(browser: Arc<dyn BrowserSession>, options: WaitOptions) -> Self {
        Self {
            browser,
            waiter: Waiter::new(options)
                .kind("condition")
                .on_predicate_failure(PredicateFailure::Propagate),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.waiter = self.waiter.with_cancellation(token);
        self
    }

    pub async fn wait(&self, script: &str) -> Result<(), WaitError> {
        let browser = self.browser.clone();
        let script = script.to_string();
        let message = format!("condition `{}` was not met", script);

        self.waiter
            .until(&message, move || {
                let browser = browser.clone();
                let script = script.clone();
                async move {
                    match browser.evaluate(&script).await? {
                        Value::Bool(done) => Ok::<bool, BrowserError>(done),
                        other => Err(BrowserError::Script(format!(
                            "condition returned {} instead of a boolean",
                            other
                        ))),
                    }
                }
            })
            .await
    }
}
