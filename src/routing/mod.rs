//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! HubRequest (method, raw path)
//!     → router.rs (strip mount prefix, scan resources)
//!     → pattern.rs (segment match, decode variables)
//!     → resource.rs (OPTIONS / HEAD / 405 / handler)
//!     → HubResponse
//!
//! Registration (at startup):
//!     Router::bind(pattern).on(method, handler)...
//!     → frozen behind Arc, read-only while serving
//! ```
//!
//! # Design Decisions
//! - Deterministic: same path against the same table always picks the same resource
//! - Specificity is the variable-segment count, ranked by `SelectionPolicy`

pub mod pattern;
pub mod resource;
pub mod router;

pub use pattern::{PathPattern, Segment};
pub use resource::{HandlerError, HandlerResult, Resource};
pub use router::{Router, SelectionPolicy};
