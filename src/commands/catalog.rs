//! Command table and the per-invocation context handed to each command.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::CommandError;
use crate::browser::{BrowserError, BrowserSession, ElementHandle, Locator};
use crate::config::WaitConfig;
use crate::wait::{PredicateFailure, WaitError, WaitOptions, Waiter};

pub type CommandResult = Result<Value, CommandError>;

pub type CommandFn = for<'a> fn(&'a CommandContext) -> BoxFuture<'a, CommandResult>;

#[derive(Clone, Copy)]
pub struct Command {
    name: &'static str,
    run: CommandFn,
}

impl Command {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn invoke(&self, ctx: &CommandContext) -> CommandResult {
        (self.run)(ctx).await
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command").field("name", &self.name).finish()
    }
}

/// Everything one command invocation may use.
pub struct CommandContext {
    pub browser: Arc<dyn BrowserSession>,
    pub command: String,
    pub args: Vec<String>,
    pub waits: WaitConfig,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn new(
        browser: Arc<dyn BrowserSession>,
        command: impl Into<String>,
        args: Vec<String>,
        waits: WaitConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            browser,
            command: command.into(),
            args,
            waits,
            cancel,
        }
    }

    pub fn arg(&self, index: usize) -> Result<&str, CommandError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingArgument {
                command: self.command.clone(),
                index,
            })
    }

    /// Argument at `index`, treating an empty string as absent.
    pub fn optional_arg(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
    }

    pub fn invalid(&self, reason: impl Into<String>) -> CommandError {
        CommandError::InvalidArgument {
            command: self.command.clone(),
            reason: reason.into(),
        }
    }

    /// Configured wait bounds, with the timeout overridden by a millisecond argument if given.
    pub fn wait_options(&self, timeout_index: usize) -> Result<WaitOptions, CommandError> {
        let options = self.waits.options();
        match self.optional_arg(timeout_index) {
            None => Ok(options),
            Some(raw) => {
                let ms = parse_millis(raw)
                    .ok_or_else(|| self.invalid(format!("timeout `{}` is not a number of milliseconds", raw)))?;
                Ok(options.with_timeout(std::time::Duration::from_millis(ms)))
            }
        }
    }

    /// Locate an element, retrying for `waits.implicit_wait_ms`.
    pub async fn find(&self, raw: &str) -> Result<ElementHandle, CommandError> {
        let locator = Locator::parse(raw)?;
        if self.waits.implicit_wait_ms == 0 {
            return Ok(self.browser.find_element(&locator).await?);
        }

        let waiter = Waiter::new(WaitOptions::from_millis(
            self.waits.implicit_wait_ms,
            self.waits.interval_ms.min(self.waits.implicit_wait_ms),
        ))
        .kind("implicit")
        .on_predicate_failure(PredicateFailure::Propagate)
        .with_cancellation(self.cancel.clone());

        let browser = self.browser.clone();
        let target = locator.clone();
        let found = waiter
            .until_some(&format!("element {} not found", locator), move || {
                let browser = browser.clone();
                let target = target.clone();
                async move {
                    match browser.find_element(&target).await {
                        Ok(handle) => Ok(Some(handle)),
                        Err(BrowserError::NoSuchElement(_)) => Ok(None),
                        Err(e) => Err(e),
                    }
                }
            })
            .await;

        match found {
            Ok(handle) => Ok(handle),
            Err(WaitError::TimedOut { .. }) => Err(BrowserError::NoSuchElement(locator.to_string()).into()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Selenese sends timeouts as strings, sometimes with a fraction (`"30000.0"`).
fn parse_millis(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
    })
}

/// Name → command table. Built once, then shared read-only.
#[derive(Debug, Default)]
pub struct CommandCatalog {
    commands: HashMap<&'static str, Command>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command the hub ships with.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        super::actions::register(&mut catalog);
        super::accessors::register(&mut catalog);
        super::waits::register(&mut catalog);
        catalog
    }

    pub fn register(&mut self, name: &'static str, run: CommandFn) -> &mut Self {
        self.commands.insert(name, Command { name, run });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub async fn invoke(&self, ctx: &CommandContext) -> CommandResult {
        let command = self
            .get(&ctx.command)
            .ok_or_else(|| CommandError::UnknownCommand(ctx.command.clone()))?;
        command.invoke(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MemoryBrowser, MemoryElement, MemoryPage};
    use std::time::Duration;

    fn context(browser: Arc<MemoryBrowser>, command: &str, args: &[&str], waits: WaitConfig) -> CommandContext {
        CommandContext::new(
            browser,
            command,
            args.iter().map(|a| a.to_string()).collect(),
            waits,
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(parse_millis("30000"), Some(30_000));
        assert_eq!(parse_millis(" 2500.0 "), Some(2_500));
        assert_eq!(parse_millis("soon"), None);
        assert_eq!(parse_millis("-1"), None);
    }

    #[test]
    fn test_standard_catalog_names() {
        let names = CommandCatalog::standard().names();
        for expected in [
            "open",
            "click",
            "type",
            "select",
            "selectWindow",
            "getText",
            "getValue",
            "getAttribute",
            "getTitle",
            "getLocation",
            "getEval",
            "isElementPresent",
            "waitForPageToLoad",
            "waitForCondition",
            "waitForPopUp",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_command_futures_are_send() {
        let mut waits = WaitConfig::default();
        waits.implicit_wait_ms = 100;
        let catalog = CommandCatalog::standard();
        let ctx = context(Arc::new(MemoryBrowser::new()), "click", &["id=q"], waits);

        assert_send(&catalog.invoke(&ctx));
        assert_send(&ctx.find("id=q"));
        for name in catalog.names() {
            let command = catalog.get(name).unwrap();
            assert_send(&command.invoke(&ctx));
        }
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let ctx = context(Arc::new(MemoryBrowser::new()), "fly", &[], WaitConfig::default());
        let err = CommandCatalog::standard().invoke(&ctx).await.unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(name) if name == "fly"));
    }

    #[test]
    fn test_wait_options_override() {
        let ctx = context(Arc::new(MemoryBrowser::new()), "waitForPageToLoad", &["1500"], WaitConfig::default());
        assert_eq!(ctx.wait_options(0).unwrap().timeout, Duration::from_millis(1_500));
        assert_eq!(ctx.wait_options(1).unwrap().timeout, Duration::from_millis(30_000));

        let bad = context(Arc::new(MemoryBrowser::new()), "waitForPageToLoad", &["soon"], WaitConfig::default());
        assert!(matches!(bad.wait_options(0), Err(CommandError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_implicit_wait_finds_late_element() {
        let browser = Arc::new(MemoryBrowser::new());
        let waits = WaitConfig {
            implicit_wait_ms: 1_000,
            interval_ms: 10,
            ..WaitConfig::default()
        };
        let ctx = context(browser.clone(), "click", &[], waits);

        let loader = browser.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            loader.add_page(MemoryPage::new("http://app.test/").with_element(MemoryElement::new("div").with_id("late")));
            loader.open("http://app.test/").await.unwrap();
        });

        ctx.find("id=late").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_element_without_implicit_wait() {
        let ctx = context(Arc::new(MemoryBrowser::new()), "click", &[], WaitConfig::default());
        let err = ctx.find("id=nope").await.unwrap_err();
        assert!(matches!(err, CommandError::Browser(BrowserError::NoSuchElement(_))));
    }

    #[tokio::test]
    async fn test_implicit_wait_timeout_is_no_such_element() {
        let waits = WaitConfig {
            implicit_wait_ms: 50,
            interval_ms: 10,
            ..WaitConfig::default()
        };
        let ctx = context(Arc::new(MemoryBrowser::new()), "click", &[], waits);
        let err = ctx.find("id=nope").await.unwrap_err();
        assert!(matches!(err, CommandError::Browser(BrowserError::NoSuchElement(_))));
    }
}
