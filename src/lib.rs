//! Selenese hub library.
//!
//! An HTTP command hub that routes legacy Selenese verbs to a structured
//! browser-control interface, with a polling waiter for page loads, popups,
//! and script conditions.

pub mod api;
pub mod browser;
pub mod commands;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod session;
pub mod wait;

pub use api::HubState;
pub use config::schema::HubConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
