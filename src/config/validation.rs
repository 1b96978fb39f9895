//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check cross-section constraints (request timeout outlasts waits)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HubConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::HubConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid address for {field}: `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("mount prefix `{0}` must be empty or start with `/`")]
    InvalidPrefix(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("waits.interval_ms ({interval_ms}) exceeds waits.timeout_ms ({timeout_ms})")]
    IntervalExceedsTimeout { interval_ms: u64, timeout_ms: u64 },

    #[error("timeouts.request_secs ({request_secs}s) must exceed waits.timeout_ms ({timeout_ms}ms)")]
    RequestTimeoutTooShort { request_secs: u64, timeout_ms: u64 },

    #[error("queue.base_delay_ms ({base}) exceeds queue.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },
}

pub fn validate_config(config: &HubConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_bytes" });
    }

    let prefix = &config.routing.mount_prefix;
    if !prefix.is_empty() && !prefix.starts_with('/') {
        errors.push(ValidationError::InvalidPrefix(prefix.clone()));
    }

    let waits = &config.waits;
    if waits.interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "waits.interval_ms" });
    }
    if waits.interval_ms > waits.timeout_ms {
        errors.push(ValidationError::IntervalExceedsTimeout {
            interval_ms: waits.interval_ms,
            timeout_ms: waits.timeout_ms,
        });
    }
    if config.timeouts.request_secs.saturating_mul(1000) <= waits.timeout_ms {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: config.timeouts.request_secs,
            timeout_ms: waits.timeout_ms,
        });
    }

    if config.queue.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "queue.max_attempts" });
    }
    if config.queue.base_delay_ms > config.queue.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.queue.base_delay_ms,
            max: config.queue.max_delay_ms,
        });
    }

    let metrics = &config.observability;
    if metrics.metrics_enabled && metrics.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: metrics.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
