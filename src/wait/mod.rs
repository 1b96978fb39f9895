//! Condition waiting subsystem.
//!
//! # Data Flow
//! ```text
//! Command (waitForPageToLoad / waitForCondition / waitForPopUp / implicit find)
//!     → specialization (page_load.rs / condition.rs / popup.rs)
//!     → waiter.rs (poll probe, sleep interval, check deadline + cancellation)
//!     → Ok(value) | WaitError::{TimedOut, Predicate, Cancelled}
//! ```
//!
//! # Design Decisions
//! - Specializations compose a `Waiter` with a probe; no inheritance
//! - Failure policy is a per-waiter setting, not hard-coded in the loop
//! - Waiters only read browser state

pub mod condition;
pub mod page_load;
pub mod popup;
pub mod waiter;

pub use condition::ConditionWaiter;
pub use page_load::{PageLoadWaiter, SettleClock};
pub use popup::{PopupTarget, PopupWaiter};
pub use waiter::{BoxError, PredicateFailure, Probe, WaitError, WaitOptions, Waiter};
