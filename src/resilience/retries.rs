//! Retry classification for queued commands.
//!
//! # Design Decisions
//! - Only navigation races are retried; the page was torn down under the command
//! - Timeouts, lookups and script errors are reported, never retried
//! - A cancelled command is never retried

use crate::browser::BrowserError;
use crate::commands::CommandError;
use crate::wait::WaitError;

pub fn is_retryable(err: &CommandError) -> bool {
    match err {
        CommandError::Browser(e) => is_transient(e),
        CommandError::Wait(WaitError::Predicate { source, .. }) => source
            .downcast_ref::<BrowserError>()
            .is_some_and(is_transient),
        _ => false,
    }
}

fn is_transient(err: &BrowserError) -> bool {
    matches!(err, BrowserError::NavigationInProgress)
}
