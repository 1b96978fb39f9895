//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HubConfig (validated)
//!     → sections handed to the server, router, queue and waiters
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates
//!     → waits section swapped into HubState (ArcSwap)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty file is valid
//! - Validation separates syntactic (serde) from semantic checks
//! - Only wait defaults reload live; listener/routing changes need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BrowserConfig, HubConfig, ListenerConfig, ObservabilityConfig, QueueConfig, RoutingConfig,
    TimeoutConfig, WaitConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
