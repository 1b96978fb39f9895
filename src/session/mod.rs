//! Browser sessions and their command queues.
//!
//! # Data Flow
//! ```text
//! POST /session        → store.rs (launch browser, register Session)
//! POST .../selenium/x  → Session::run → queue.rs (serialize, retry) → commands
//! POST .../interrupt   → queue.rs (cancel the in-flight command's token)
//! DELETE /session/:id  → store.rs (remove) → queue shutdown → browser close
//! ```

pub mod queue;
pub mod store;

pub use queue::CommandQueue;
pub use store::{Session, SessionStore};
