//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Command fails inside the session queue:
//!     → retries.rs (is the failure a navigation race?)
//!     → backoff.rs (how long to pause before the next attempt)
//!     → re-run, up to queue.max_attempts
//! ```
//!
//! # Design Decisions
//! - Jittered backoff keeps concurrent sessions from retrying in lockstep
//! - Deadlines live in the waiters; this layer never adds its own timeout

pub mod backoff;
pub mod retries;

pub use backoff::backoff_delay;
pub use retries::is_retryable;
