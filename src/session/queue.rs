//! Per-session command queue.
//!
//! # Responsibilities
//! - Run one command at a time against a session's browser
//! - Give each command its own cancellation token so `interrupt` aborts only that command
//! - Retry navigation races with jittered exponential backoff
//!
//! # State Transitions
//! ```text
//! Idle → Running:     gate acquired, child token installed
//! Running → Retrying: retryable failure, attempts left, not cancelled
//! Retrying → Running: backoff elapsed
//! Running → Idle:     result returned, token cleared
//! any → Closed:       shutdown() cancels the root token; later commands fail fast
//! ```
//!
//! # Design Decisions
//! - Commands queue on a `tokio::sync::Mutex`, so waiting callers are served FIFO
//! - Interrupting never touches the browser; the running waiter observes the token

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserError, BrowserSession};
use crate::commands::{CommandCatalog, CommandContext, CommandError, CommandResult};
use crate::config::{QueueConfig, WaitConfig};
use crate::observability::metrics;
use crate::resilience::{backoff_delay, is_retryable};

#[derive(Debug)]
pub struct CommandQueue {
    gate: tokio::sync::Mutex<()>,
    root: CancellationToken,
    in_flight: Mutex<Option<CancellationToken>>,
    config: QueueConfig,
}

impl CommandQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self::with_parent(config, &CancellationToken::new())
    }

    /// Queue whose commands are also cancelled when `parent` is.
    pub fn with_parent(config: QueueConfig, parent: &CancellationToken) -> Self {
        Self {
            gate: tokio::sync::Mutex::new(()),
            root: parent.child_token(),
            in_flight: Mutex::new(None),
            config,
        }
    }

    pub async fn execute(
        &self,
        catalog: &CommandCatalog,
        browser: Arc<dyn BrowserSession>,
        command: &str,
        args: Vec<String>,
        waits: WaitConfig,
    ) -> CommandResult {
        let _turn = self.gate.lock().await;
        if self.root.is_cancelled() {
            return Err(CommandError::Browser(BrowserError::Closed));
        }

        let token = self.root.child_token();
        let _in_flight = InFlight::install(&self.in_flight, token.clone());

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let result = loop {
            let ctx = CommandContext::new(browser.clone(), command, args.clone(), waits.clone(), token.clone());
            match catalog.invoke(&ctx).await {
                Err(e) if attempt < max_attempts && is_retryable(&e) && !token.is_cancelled() => {
                    let delay = backoff_delay(attempt, &self.config);
                    tracing::info!(
                        command,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying command"
                    );
                    metrics::record_command_retry(command);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => break Err(e),
                    }
                    attempt += 1;
                }
                other => break other,
            }
        };

        result
    }

    /// Cancel the running command, if any. Queued commands are unaffected.
    pub fn interrupt(&self) -> bool {
        let guard = self.in_flight.lock().expect("in-flight token lock poisoned");
        match guard.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the running command and reject every later one.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight token lock poisoned")
            .is_some()
    }
}

/// Holds the running command's token in `in_flight`; clears it on drop, even when
/// the caller abandons `execute` mid-command.
struct InFlight<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl<'a> InFlight<'a> {
    fn install(slot: &'a Mutex<Option<CancellationToken>>, token: CancellationToken) -> Self {
        *slot.lock().expect("in-flight token lock poisoned") = Some(token);
        Self { slot }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MemoryBrowser, ReadyState};
    use crate::wait::WaitError;
    use serde_json::Value;
    use std::time::Duration;

    fn fast_waits() -> WaitConfig {
        WaitConfig {
            interval_ms: 5,
            page_load_settle_ms: 0,
            ..WaitConfig::default()
        }
    }

    fn quick_retries() -> QueueConfig {
        QueueConfig {
            max_attempts: 3,
            base_delay_ms: 5,
            max_delay_ms: 20,
        }
    }

    #[tokio::test]
    async fn test_navigation_race_is_retried() {
        let browser = Arc::new(MemoryBrowser::new());
        browser.script_results(
            "document.title",
            vec![Err(BrowserError::NavigationInProgress), Ok(Value::from("Done"))],
        );
        let queue = CommandQueue::new(quick_retries());

        let value = queue
            .execute(&CommandCatalog::standard(), browser, "getEval", vec!["document.title".into()], fast_waits())
            .await
            .unwrap();
        assert_eq!(value, "Done");
    }

    #[tokio::test]
    async fn test_retries_stop_at_max_attempts() {
        let browser = Arc::new(MemoryBrowser::new());
        browser.script_results("x", vec![Err(BrowserError::NavigationInProgress)]);
        let queue = CommandQueue::new(quick_retries());

        let err = queue
            .execute(&CommandCatalog::standard(), browser, "getEval", vec!["x".into()], fast_waits())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Browser(BrowserError::NavigationInProgress)));
    }

    #[tokio::test]
    async fn test_interrupt_cancels_running_wait() {
        let browser = Arc::new(MemoryBrowser::new());
        browser.queue_ready_states((0..10_000).map(|_| Ok(ReadyState::Loading)).collect());
        let queue = Arc::new(CommandQueue::new(quick_retries()));

        let runner = queue.clone();
        let task = tokio::spawn(async move {
            runner
                .execute(&CommandCatalog::standard(), browser, "waitForPageToLoad", vec!["20000".into()], fast_waits())
                .await
        });

        while !queue.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(queue.interrupt());

        let err = tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap_err();
        assert!(matches!(err, CommandError::Wait(WaitError::Cancelled { .. })));
        assert!(!queue.is_busy());
        assert!(!queue.interrupt());
    }

    #[tokio::test]
    async fn test_abandoned_command_clears_in_flight() {
        let browser = Arc::new(MemoryBrowser::new());
        browser.queue_ready_states((0..10_000).map(|_| Ok(ReadyState::Loading)).collect());
        let queue = CommandQueue::new(quick_retries());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            queue.execute(
                &CommandCatalog::standard(),
                browser.clone(),
                "waitForPageToLoad",
                vec!["60000".into()],
                fast_waits(),
            ),
        )
        .await;
        assert!(abandoned.is_err());

        assert!(!queue.is_busy());
        assert!(!queue.interrupt());

        // The gate was released too; the next command runs.
        let title = queue
            .execute(&CommandCatalog::standard(), browser, "getTitle", vec![], fast_waits())
            .await
            .unwrap();
        assert_eq!(title, "");
    }

    #[tokio::test]
    async fn test_commands_run_one_at_a_time() {
        let browser: Arc<dyn BrowserSession> = Arc::new(MemoryBrowser::new());
        let queue = Arc::new(CommandQueue::new(quick_retries()));
        let catalog = Arc::new(CommandCatalog::standard());

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let (queue, catalog, browser) = (queue.clone(), catalog.clone(), browser.clone());
            tasks.push(tokio::spawn(async move {
                queue
                    .execute(&catalog, browser, "waitForPageToLoad", vec![], fast_waits())
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(!queue.is_busy());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_later_commands() {
        let parent = CancellationToken::new();
        let queue = CommandQueue::with_parent(quick_retries(), &parent);
        parent.cancel();

        let err = queue
            .execute(&CommandCatalog::standard(), Arc::new(MemoryBrowser::new()), "getTitle", vec![], fast_waits())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Browser(BrowserError::Closed)));
    }
}
