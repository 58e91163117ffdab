//! # Circuit Breaker Registry
//!
//! Process-wide, explicitly-owned registry of circuit breakers keyed by
//! (group, command) plus the bounded execution pools that isolate each
//! dependency group. Constructed once at startup and passed to every client
//! that issues commands; there is no hidden singleton.

use crate::config::CircuitBreakerSettings;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::metrics::{BreakerMetrics, RegistryMetrics};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};

/// Identifies the shared circuit state and isolation pool of a command.
///
/// The group names the downstream dependency (one execution pool per group),
/// the name identifies the operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandKey {
    group: String,
    name: String,
}

impl CommandKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// Registry of circuit breakers and per-group execution pools
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    /// Collection of circuit breakers by command key
    circuit_breakers: Arc<RwLock<HashMap<CommandKey, Arc<CircuitBreaker>>>>,

    /// Bounded execution pools, one per command group
    pools: Arc<RwLock<HashMap<String, Arc<Semaphore>>>>,

    /// Configuration (defaults plus per-command overrides)
    settings: CircuitBreakerSettings,
}

impl CircuitBreakerRegistry {
    /// Create a new registry from configuration
    pub fn from_settings(settings: &CircuitBreakerSettings) -> Self {
        info!(
            enabled = settings.enabled,
            overrides = settings.commands.len(),
            "Initializing circuit breaker registry"
        );

        Self {
            circuit_breakers: Arc::new(RwLock::new(HashMap::new())),
            pools: Arc::new(RwLock::new(HashMap::new())),
            settings: settings.clone(),
        }
    }

    /// Whether circuit breaking is enabled at all.
    ///
    /// When disabled, commands still run with timeout and fallback but no
    /// admission control or window bookkeeping takes place.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Get or create the circuit breaker for a command key
    pub async fn breaker(&self, key: &CommandKey) -> Arc<CircuitBreaker> {
        // Try to get existing circuit breaker
        {
            let breakers = self.circuit_breakers.read().await;
            if let Some(breaker) = breakers.get(key) {
                return Arc::clone(breaker);
            }
        }

        let mut breakers = self.circuit_breakers.write().await;

        // Double-check pattern (another task might have created it)
        if let Some(breaker) = breakers.get(key) {
            return Arc::clone(breaker);
        }

        let config = self.settings.config_for(&key.to_string());
        if let Err(reason) = config.validate() {
            warn!(
                command = %key,
                reason = %reason,
                "Invalid breaker configuration, falling back to defaults"
            );
        }

        let breaker = Arc::new(CircuitBreaker::new(key.to_string(), config));
        breakers.insert(key.clone(), Arc::clone(&breaker));

        info!(
            command = %key,
            total_circuit_breakers = breakers.len(),
            "Created new circuit breaker"
        );

        breaker
    }

    /// Get or create the bounded execution pool for a command group
    pub async fn pool(&self, key: &CommandKey) -> Arc<Semaphore> {
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(key.group()) {
                return Arc::clone(pool);
            }
        }

        let mut pools = self.pools.write().await;
        if let Some(pool) = pools.get(key.group()) {
            return Arc::clone(pool);
        }

        let permits = self
            .settings
            .config_for(&key.to_string())
            .max_concurrent_requests;
        let pool = Arc::new(Semaphore::new(permits));
        pools.insert(key.group().to_string(), Arc::clone(&pool));

        info!(
            group = key.group(),
            permits = permits,
            "Created execution pool for command group"
        );

        pool
    }

    /// Get all registered command keys
    pub async fn list_commands(&self) -> Vec<CommandKey> {
        let breakers = self.circuit_breakers.read().await;
        breakers.keys().cloned().collect()
    }

    /// Get metrics for a specific circuit breaker
    pub async fn command_metrics(&self, key: &CommandKey) -> Option<BreakerMetrics> {
        let breakers = self.circuit_breakers.read().await;
        breakers.get(key).map(|breaker| breaker.metrics())
    }

    /// Get registry-wide circuit breaker metrics
    pub async fn registry_metrics(&self) -> RegistryMetrics {
        let mut metrics = RegistryMetrics::new();

        let breakers = self.circuit_breakers.read().await;
        for (key, breaker) in breakers.iter() {
            metrics.add_circuit_breaker(key.to_string(), breaker.metrics());
        }

        metrics
    }

    /// Get count of circuit breakers by state
    pub async fn state_summary(&self) -> HashMap<CircuitState, usize> {
        self.registry_metrics().await.count_by_state()
    }

    /// Force open all circuit breakers (emergency stop)
    pub async fn force_open_all(&self) {
        warn!("🚨 Forcing all circuit breakers open (emergency stop)");

        let breakers = self.circuit_breakers.read().await;
        for breaker in breakers.values() {
            breaker.force_open();
        }
    }

    /// Force close all circuit breakers (emergency recovery)
    pub async fn force_close_all(&self) {
        warn!("🚨 Forcing all circuit breakers closed (emergency recovery)");

        let breakers = self.circuit_breakers.read().await;
        for breaker in breakers.values() {
            breaker.force_closed();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::from_settings(&CircuitBreakerSettings::default())
    }
}

impl Clone for CircuitBreakerRegistry {
    fn clone(&self) -> Self {
        Self {
            circuit_breakers: Arc::clone(&self.circuit_breakers),
            pools: Arc::clone(&self.pools),
            settings: self.settings.clone(),
        }
    }
}
