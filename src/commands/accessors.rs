//! Commands that read browser state.

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::catalog::{CommandCatalog, CommandContext, CommandResult};
use crate::browser::locator::split_attribute_locator;
use crate::browser::{BrowserError, Locator};

pub fn register(catalog: &mut CommandCatalog) {
    catalog
        .register("getText", get_text)
        .register("getValue", get_value)
        .register("getAttribute", get_attribute)
        .register("getTitle", get_title)
        .register("getLocation", get_location)
        .register("getEval", get_eval)
        .register("isElementPresent", is_element_present);
}

fn get_text(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let element = ctx.find(ctx.arg(0)?).await?;
        Ok(Value::String(ctx.browser.text(&element).await?))
    })
}

fn get_value(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let element = ctx.find(ctx.arg(0)?).await?;
        Ok(Value::String(ctx.browser.value(&element).await?))
    })
}

/// `getAttribute(locator@name)`. A missing attribute reads as `null`.
fn get_attribute(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let (locator, name) = split_attribute_locator(ctx.arg(0)?)?;
        let element = ctx.find(locator).await?;
        Ok(ctx
            .browser
            .attribute(&element, name)
            .await?
            .map(Value::String)
            .unwrap_or(Value::Null))
    })
}

fn get_title(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move { Ok(Value::String(ctx.browser.title().await?)) })
}

fn get_location(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move { Ok(Value::String(ctx.browser.current_url().await?)) })
}

fn get_eval(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move { Ok(ctx.browser.evaluate(ctx.arg(0)?).await?) })
}

/// Single lookup; never waits.
fn is_element_present(ctx: &CommandContext) -> BoxFuture<'_, CommandResult> {
    Box::pin(async move {
        let locator = Locator::parse(ctx.arg(0)?)?;
        match ctx.browser.find_element(&locator).await {
            Ok(_) => Ok(Value::Bool(true)),
            Err(BrowserError::NoSuchElement(_)) => Ok(Value::Bool(false)),
            Err(e) => Err(e.into()),
        }
    })
}
