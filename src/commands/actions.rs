//! Commands that change browser state.

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::catalog::{CommandCatalog, CommandContext, CommandResult};
use crate::browser::OptionLocator;
use crate::wait::PageLoadWaiter;

pub fn register(catalog: &mut CommandCatalog) {
    catalog
        .register("open", open)
        .register("click", click)
        .register("type", type_text)
        .register("select", select)
        .register("selectWindow", select_window);
}

/// `open(url)`: navigate, then wait for the page to load.
fn open(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let url = ctx.arg(0)?;
        ctx.browser.open(url).await?;
        PageLoadWaiter::new(ctx.browser.clone(), ctx.waits.options())
            .with_settle(ctx.waits.settle())
            .with_cancellation(ctx.cancel.clone())
            .wait()
            .await?;
        Ok(Value::Null)
    })
}

fn click(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let element = ctx.find(ctx.arg(0)?).await?;
        ctx.browser.click(&element).await?;
        Ok(Value::Null)
    })
}

/// `type(locator, value)`: replace the element's value.
fn type_text(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let element = ctx.find(ctx.arg(0)?).await?;
        let value = ctx.optional_arg(1).unwrap_or_default();
        ctx.browser.set_value(&element, value).await?;
        Ok(Value::Null)
    })
}

/// `select(selectLocator, optionLocator)`.
fn select(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let option = OptionLocator::parse(ctx.arg(1)?)?;
        let element = ctx.find(ctx.arg(0)?).await?;
        ctx.browser.select_option(&element, &option).await?;
        Ok(Value::Null)
    })
}

/// `selectWindow(windowId)`: `null` or empty selects the main window.
fn select_window(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let target = match ctx.optional_arg(0) {
            None | Some("null") => None,
            Some(raw) => Some(raw.strip_prefix("name=").unwrap_or(raw)),
        };
        ctx.browser.select_window(target).await?;
        Ok(Value::Null)
    })
}
