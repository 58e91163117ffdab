//! # Circuit Breaker Configuration
//!
//! Configuration structures and validation for circuit breaker behavior.
//! System-wide settings (per-component overrides, enablement) live in
//! `crate::config::CircuitBreakerSettings`; this module holds the knobs of a
//! single breaker instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Error percentage within the rolling window at which the circuit opens
    pub error_threshold_percentage: u8,

    /// Minimum number of requests in the rolling window before the error
    /// rate is evaluated at all
    pub request_volume_threshold: u32,

    /// Time to wait in open state before admitting a single probe request
    pub sleep_window: Duration,

    /// Length of the rolling statistical window
    pub rolling_window: Duration,

    /// Number of buckets the rolling window is divided into
    pub window_buckets: usize,

    /// Maximum concurrent executions per command group before rejecting
    pub max_concurrent_requests: usize,
}

impl BreakerConfig {
    /// Create configuration for external HTTP API calls
    pub fn for_external_api() -> Self {
        Self {
            sleep_window: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Create configuration for broker publish operations
    pub fn for_broker() -> Self {
        Self {
            error_threshold_percentage: 50,
            request_volume_threshold: 10,
            sleep_window: Duration::from_secs(15),
            ..Default::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.error_threshold_percentage == 0 || self.error_threshold_percentage > 100 {
            return Err("error_threshold_percentage must be in 1..=100".to_string());
        }

        if self.request_volume_threshold == 0 {
            return Err("request_volume_threshold must be greater than 0".to_string());
        }

        if self.sleep_window.is_zero() {
            return Err("sleep_window must be greater than 0".to_string());
        }

        if self.rolling_window.is_zero() {
            return Err("rolling_window must be greater than 0".to_string());
        }

        if self.window_buckets == 0 {
            return Err("window_buckets must be greater than 0".to_string());
        }

        if self.rolling_window.as_millis() % self.window_buckets as u128 != 0 {
            return Err("rolling_window must divide evenly into window_buckets".to_string());
        }

        if self.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold_percentage: 50,
            request_volume_threshold: 20,
            sleep_window: Duration::from_secs(5),
            rolling_window: Duration::from_secs(10),
            window_buckets: 10,
            max_concurrent_requests: 10,
        }
    }
}
