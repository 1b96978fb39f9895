//! Browser collaborator interface.
//!
//! # Data Flow
//! ```text
//! Selenese command (commands/)
//!     → locator.rs (parse "id=foo", "css=...", implicit locators)
//!     → BrowserSession (structured browser calls)
//!     → driver implementation (memory.rs, or an external driver)
//! ```
//!
//! # Design Decisions
//! - The hub only sees `Arc<dyn BrowserSession>`; drivers are pluggable
//! - Element references are opaque handles issued by the driver
//! - Every call is async and fallible; errors carry enough context for the wire payload

pub mod locator;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use locator::{Locator, OptionLocator};
pub use memory::{MemoryBrowser, MemoryBrowserFactory, MemoryElement, MemoryPage};

/// Location reported by windows that have not navigated anywhere yet.
pub const BLANK_LOCATION: &str = "about:blank";

/// Errors reported by browser calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrowserError {
    #[error("element not found: {0}")]
    NoSuchElement(String),
    #[error("window not found: {0}")]
    NoSuchWindow(String),
    #[error("option not found: {0}")]
    NoSuchOption(String),
    #[error("script error: {0}")]
    Script(String),
    #[error("navigation in progress")]
    NavigationInProgress,
    #[error("unexpected alert open: {0}")]
    UnexpectedAlert(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("browser session closed")]
    Closed,
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// `document.readyState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "loading" => Some(Self::Loading),
            "interactive" => Some(Self::Interactive),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Interactive => "interactive",
            Self::Complete => "complete",
        }
    }
}

/// Opaque reference to an element inside a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// A top-level browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Driver-issued handle.
    pub handle: String,
    /// `window.name`, empty for the main window.
    pub name: String,
}

impl WindowInfo {
    /// True if `target` names this window by handle or by `window.name`.
    pub fn answers_to(&self, target: &str) -> bool {
        self.handle == target || (!self.name.is_empty() && self.name == target)
    }
}

/// Structured browser control used by the Selenese command catalog.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the current window. Relative URLs resolve against the current location.
    async fn open(&self, url: &str) -> BrowserResult<()>;

    async fn current_url(&self) -> BrowserResult<String>;

    async fn title(&self) -> BrowserResult<String>;

    async fn ready_state(&self) -> BrowserResult<ReadyState>;

    /// Evaluate a script expression in the current window.
    async fn evaluate(&self, script: &str) -> BrowserResult<Value>;

    async fn find_element(&self, locator: &Locator) -> BrowserResult<ElementHandle>;

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()>;

    /// Replace the element's value (Selenese `type` semantics).
    async fn set_value(&self, element: &ElementHandle, value: &str) -> BrowserResult<()>;

    async fn text(&self, element: &ElementHandle) -> BrowserResult<String>;

    async fn value(&self, element: &ElementHandle) -> BrowserResult<String>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> BrowserResult<Option<String>>;

    async fn select_option(&self, element: &ElementHandle, option: &OptionLocator) -> BrowserResult<()>;

    async fn windows(&self) -> BrowserResult<Vec<WindowInfo>>;

    async fn window_location(&self, handle: &str) -> BrowserResult<String>;

    /// Make a window current. `None` selects the main window.
    async fn select_window(&self, target: Option<&str>) -> BrowserResult<()>;

    async fn close(&self) -> BrowserResult<()>;
}

/// Launches browser sessions for the hub.
#[async_trait]
pub trait BrowserFactory: Send + Sync {
    async fn launch(&self, capabilities: &Value) -> BrowserResult<Arc<dyn BrowserSession>>;
}
