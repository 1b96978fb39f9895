//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! router dispatch, waiters, session store, command queue
//!     → logging.rs (tracing events with request_id / session_id / command fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape (when metrics_enabled)
//! ```

pub mod logging;
pub mod metrics;
