//! Selenese command catalog.
//!
//! # Data Flow
//! ```text
//! POST /session/:sessionId/selenium/:command {"args": [...]}
//!     → session::CommandQueue (serialize, retry, cancellation)
//!     → catalog.rs (name → Command)
//!     → actions.rs / accessors.rs / waits.rs
//!     → BrowserSession calls, waiters
//!     → JSON value or CommandError
//! ```
//!
//! # Design Decisions
//! - One flat name → function table, built once by `CommandCatalog::standard()`
//! - Commands receive positional string arguments, as the legacy protocol sends them
//! - Every error maps to a wire status so clients can tell timeouts from lookups

pub mod accessors;
pub mod actions;
pub mod catalog;
pub mod waits;

use thiserror::Error;

use crate::browser::BrowserError;
use crate::http::WireStatus;
use crate::routing::HandlerError;
use crate::wait::WaitError;

pub use catalog::{Command, CommandCatalog, CommandContext, CommandResult};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("{command}: missing argument #{index}")]
    MissingArgument { command: String, index: usize },

    #[error("{command}: {reason}")]
    InvalidArgument { command: String, reason: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Wait(#[from] WaitError),
}

impl CommandError {
    pub fn wire_status(&self) -> WireStatus {
        match self {
            CommandError::UnknownCommand(_) => WireStatus::UnknownCommand,
            CommandError::MissingArgument { .. } | CommandError::InvalidArgument { .. } => {
                WireStatus::UnknownError
            }
            CommandError::Browser(e) => browser_status(e),
            CommandError::Wait(WaitError::TimedOut { .. }) => WireStatus::Timeout,
            CommandError::Wait(WaitError::Predicate { source, .. }) => source
                .downcast_ref::<BrowserError>()
                .map(browser_status)
                .unwrap_or(WireStatus::UnknownError),
            CommandError::Wait(WaitError::Cancelled { .. }) => WireStatus::UnknownError,
        }
    }
}

fn browser_status(err: &BrowserError) -> WireStatus {
    match err {
        BrowserError::NoSuchElement(_) | BrowserError::NoSuchOption(_) => WireStatus::NoSuchElement,
        BrowserError::NoSuchWindow(_) => WireStatus::NoSuchWindow,
        BrowserError::Script(_) => WireStatus::JavaScriptError,
        BrowserError::UnexpectedAlert(_) => WireStatus::UnexpectedAlertOpen,
        BrowserError::NavigationInProgress
        | BrowserError::InvalidArgument(_)
        | BrowserError::Unsupported(_)
        | BrowserError::Closed => WireStatus::UnknownError,
    }
}

impl From<CommandError> for HandlerError {
    fn from(err: CommandError) -> Self {
        HandlerError::new(err.to_string()).with_wire_status(err.wire_status())
    }
}
