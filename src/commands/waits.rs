//! Explicit wait commands. Timeouts are optional millisecond arguments.

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::catalog::{CommandCatalog, CommandContext, CommandResult};
use crate::wait::{ConditionWaiter, PageLoadWaiter, PopupTarget, PopupWaiter};

pub fn register(catalog: &mut CommandCatalog) {
    catalog
        .register("waitForPageToLoad", wait_for_page_to_load)
        .register("waitForCondition", wait_for_condition)
        .register("waitForPopUp", wait_for_popup);
}

/// `waitForPageToLoad([timeout])`.
fn wait_for_page_to_load(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        PageLoadWaiter::new(ctx.browser.clone(), ctx.wait_options(0)?)
            .with_settle(ctx.waits.settle())
            .with_cancellation(ctx.cancel.clone())
            .wait()
            .await?;
        Ok(Value::Null)
    })
}

/// `waitForCondition(script, [timeout])`.
fn wait_for_condition(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let script = ctx.arg(0)?;
        ConditionWaiter::new(ctx.browser.clone(), ctx.wait_options(1)?)
            .with_cancellation(ctx.cancel.clone())
            .wait(script)
            .await?;
        Ok(Value::Null)
    })
}

/// `waitForPopUp(windowId, [timeout])`; returns the popup's handle.
fn wait_for_popup(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let target = PopupTarget::parse(ctx.optional_arg(0).unwrap_or_default());
        let handle = PopupWaiter::new(ctx.browser.clone(), ctx.wait_options(1)?)
            .with_cancellation(ctx.cancel.clone())
            .wait(&target)
            .await?;
        Ok(Value::String(handle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserSession, MemoryBrowser, ReadyState};
    use crate::commands::CommandError;
    use crate::config::WaitConfig;
    use crate::http::WireStatus;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx(browser: Arc<MemoryBrowser>, command: &str, args: &[&str], cancel: CancellationToken) -> CommandContext {
        let waits = WaitConfig {
            interval_ms: 5,
            page_load_settle_ms: 10,
            ..WaitConfig::default()
        };
        CommandContext::new(
            browser,
            command,
            args.iter().map(|a| a.to_string()).collect(),
            waits,
            cancel,
        )
    }

    #[tokio::test]
    async fn test_wait_for_page_to_load_after_slow_navigation() {
        let browser = Arc::new(MemoryBrowser::new().with_load_steps(3));
        browser.open("http://app.test/").await.unwrap();

        let c = ctx(browser, "waitForPageToLoad", &["2000"], CancellationToken::new());
        CommandCatalog::standard().invoke(&c).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_page_to_load_timeout_is_wire_timeout() {
        let browser = Arc::new(MemoryBrowser::new());
        browser.queue_ready_states((0..200).map(|_| Ok(ReadyState::Loading)).collect());

        let c = ctx(browser, "waitForPageToLoad", &["50"], CancellationToken::new());
        let err = CommandCatalog::standard().invoke(&c).await.unwrap_err();
        assert_eq!(err.wire_status(), WireStatus::Timeout);
    }

    #[tokio::test]
    async fn test_wait_for_condition_script_error_is_javascript_error() {
        let browser = Arc::new(MemoryBrowser::new());
        let c = ctx(browser, "waitForCondition", &["no.such.thing", "1000"], CancellationToken::new());
        let err = CommandCatalog::standard().invoke(&c).await.unwrap_err();
        assert_eq!(err.wire_status(), WireStatus::JavaScriptError);
    }

    #[tokio::test]
    async fn test_wait_for_popup_returns_handle() {
        let browser = Arc::new(MemoryBrowser::new());
        let opener = browser.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            opener.open_window("report", "http://app.test/report");
        });

        let c = ctx(browser, "waitForPopUp", &["report", "2000"], CancellationToken::new());
        let handle = CommandCatalog::standard().invoke(&c).await.unwrap();
        assert_eq!(handle, "window-1");
    }

    #[tokio::test]
    async fn test_cancelled_wait() {
        let browser = Arc::new(MemoryBrowser::new());
        browser.script_results("window.never", vec![Ok(Value::Bool(false))]);
        let cancel = CancellationToken::new();
        let c = ctx(browser, "waitForCondition", &["window.never", "10000"], cancel.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });

        let err = CommandCatalog::standard().invoke(&c).await.unwrap_err();
        assert!(matches!(err, CommandError::Wait(crate::wait::WaitError::Cancelled { .. })));
    }
}
