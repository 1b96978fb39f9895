//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum, middleware: request id, trace, timeout, body limit)
//!     → request.rs (buffer into HubRequest)
//!     → routing::Router::dispatch
//!     → response.rs (HubResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{HubRequest, X_REQUEST_ID};
pub use response::{ErrorPayload, HubResponse, WireStatus};
pub use server::HttpServer;
