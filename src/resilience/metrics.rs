//! # Circuit Breaker Metrics
//!
//! Snapshot structures for monitoring circuit breaker behavior. Snapshots
//! are cheap copies taken from the rolling window; they never hold locks.

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::window::WindowCounts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Total number of calls recorded in the rolling window
    pub total_calls: u64,

    /// Number of successful calls in the window
    pub success_count: u64,

    /// Number of failed calls in the window
    pub failure_count: u64,

    /// Number of timed-out calls in the window
    pub timeout_count: u64,

    /// Number of pool-rejected calls in the window
    pub rejected_count: u64,

    /// Current circuit breaker state
    pub current_state: CircuitState,

    /// Window error percentage (0.0 to 100.0)
    pub error_percentage: f64,
}

impl BreakerMetrics {
    /// Build a snapshot from the current window counts
    pub fn from_counts(state: CircuitState, counts: WindowCounts) -> Self {
        Self {
            total_calls: counts.total(),
            success_count: counts.success,
            failure_count: counts.failure,
            timeout_count: counts.timeout,
            rejected_count: counts.rejected,
            current_state: state,
            error_percentage: counts.error_percentage(),
        }
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.error_percentage < 10.0,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true, // Half-open is attempting recovery
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing system health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Errors: {:.1}% | Failures: {} | Timeouts: {} | Rejected: {}",
            self.state_description(),
            self.total_calls,
            self.error_percentage,
            self.failure_count,
            self.timeout_count,
            self.rejected_count
        )
    }
}

/// Registry-wide circuit breaker metrics aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryMetrics {
    /// Metrics for individual circuit breakers by name
    pub circuit_breakers: HashMap<String, BreakerMetrics>,

    /// Timestamp of last metrics collection
    pub collected_at: chrono::DateTime<chrono::Utc>,
}

impl RegistryMetrics {
    /// Create new registry metrics
    pub fn new() -> Self {
        Self {
            circuit_breakers: HashMap::new(),
            collected_at: chrono::Utc::now(),
        }
    }

    /// Add metrics for a circuit breaker
    pub fn add_circuit_breaker(&mut self, name: String, metrics: BreakerMetrics) {
        self.circuit_breakers.insert(name, metrics);
        self.collected_at = chrono::Utc::now();
    }

    /// Get count of circuit breakers by state
    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();

        for metrics in self.circuit_breakers.values() {
            let count = counts.entry(metrics.current_state).or_insert(0);
            *count += 1;
        }

        counts
    }

    /// Get list of unhealthy circuit breakers
    pub fn unhealthy_circuits(&self) -> Vec<(&String, &BreakerMetrics)> {
        self.circuit_breakers
            .iter()
            .filter(|(_, metrics)| !metrics.is_healthy())
            .collect()
    }

    /// Calculate system-wide health score (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0; // No circuit breakers = healthy
        }

        let healthy_count = self
            .circuit_breakers
            .values()
            .filter(|metrics| metrics.is_healthy())
            .count();

        healthy_count as f64 / self.circuit_breakers.len() as f64
    }

    /// Format summary for logging
    pub fn format_summary(&self) -> String {
        let state_counts = self.count_by_state();
        let closed_count = state_counts.get(&CircuitState::Closed).unwrap_or(&0);
        let open_count = state_counts.get(&CircuitState::Open).unwrap_or(&0);
        let half_open_count = state_counts.get(&CircuitState::HalfOpen).unwrap_or(&0);

        format!(
            "Circuit Breakers: {} total | {} closed | {} open | {} half-open | Health: {:.1}%",
            self.circuit_breakers.len(),
            closed_count,
            open_count,
            half_open_count,
            self.health_score() * 100.0
        )
    }
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self::new()
    }
}
