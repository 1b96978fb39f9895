//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the hub.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::routing::SelectionPolicy;
use crate::wait::page_load::DEFAULT_SETTLE_MS;
use crate::wait::waiter::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::wait::WaitOptions;

/// Root configuration for the hub.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Mount prefix and resource selection.
    pub routing: RoutingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Wait defaults for Selenese commands. Hot-reloadable.
    pub waits: WaitConfig,

    /// Per-session command queue retry settings.
    pub queue: QueueConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Browser launch settings.
    pub browser: BrowserConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:4444").
    pub bind_address: String,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4444".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Every routable path starts with this (empty disables the check).
    pub mount_prefix: String,

    /// Tie-break among several matching resources.
    pub selection: SelectionPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mount_prefix: "/hub".to_string(),
            selection: SelectionPolicy::default(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must outlast the longest wait a command can run.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Default wait timeout when a command omits one.
    pub timeout_ms: u64,

    /// Delay between predicate checks.
    pub interval_ms: u64,

    /// Quiet period after `readyState == complete`.
    pub page_load_settle_ms: u64,

    /// How long element lookups keep retrying. 0 = single attempt.
    pub implicit_wait_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            page_load_settle_ms: DEFAULT_SETTLE_MS,
            implicit_wait_ms: 0,
        }
    }
}

impl WaitConfig {
    pub fn options(&self) -> WaitOptions {
        WaitOptions::from_millis(self.timeout_ms, self.interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.page_load_settle_ms)
    }
}

/// Command queue retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Attempts per command, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Location new in-memory browser sessions start at.
    pub start_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            start_url: crate::browser::BLANK_LOCATION.to_string(),
        }
    }
}
