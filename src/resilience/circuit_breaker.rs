//! # Circuit Breaker Implementation
//!
//! Provides fault isolation to prevent cascade failures when a downstream
//! dependency degrades. The implementation follows the classic three-state
//! pattern: Closed (normal operation), Open (failing fast), and Half-Open
//! (testing recovery with a single probe request).
//!
//! State transitions are driven by a rolling-window error rate rather than a
//! consecutive-failure count: the circuit opens when the error percentage
//! within the window crosses the configured threshold, provided the request
//! volume in the window is high enough to be meaningful.

use crate::resilience::config::BreakerConfig;
use crate::resilience::metrics::BreakerMetrics;
use crate::resilience::window::{Outcome, RollingWindow};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - a single probe call is allowed through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

/// Proof that the breaker admitted an execution.
///
/// The holder must hand it back through [`CircuitBreaker::record`] (or
/// [`CircuitBreaker::abandon`] for caller errors) exactly once.
#[derive(Debug)]
pub struct ExecutionPermit {
    pub(crate) probe: bool,
}

/// Result of asking the breaker whether a call may proceed
#[derive(Debug)]
pub enum Admission {
    /// Call may proceed; report the outcome through the permit
    Allowed(ExecutionPermit),
    /// Circuit is open; skip the work and fall back immediately
    ShortCircuited,
}

/// Core circuit breaker with atomic state management and a rolling window
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics (group:command)
    name: String,

    /// Current circuit state (atomic for thread safety)
    state: AtomicU8,

    /// Configuration parameters
    config: BreakerConfig,

    /// Rolling outcome counters, lock held only for short increments
    window: Mutex<RollingWindow>,

    /// Time when circuit was opened (for sleep window calculations)
    opened_at: Mutex<Option<Instant>>,

    /// Whether a half-open probe is currently in flight
    probe_in_flight: AtomicBool,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: BreakerConfig) -> Self {
        info!(
            component = %name,
            error_threshold_percentage = config.error_threshold_percentage,
            request_volume_threshold = config.request_volume_threshold,
            sleep_window_ms = config.sleep_window.as_millis() as u64,
            "🛡️ Circuit breaker initialized"
        );

        let window = RollingWindow::new(config.rolling_window, config.window_buckets);

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            window: Mutex::new(window),
            opened_at: Mutex::new(None),
            probe_in_flight: AtomicBool::new(false),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask whether a call may proceed right now.
    ///
    /// In the open state, once the sleep window has elapsed exactly one
    /// caller is admitted as a probe; everyone else keeps short-circuiting
    /// until the probe resolves.
    pub fn try_acquire(&self) -> Admission {
        match self.state() {
            CircuitState::Closed => Admission::Allowed(ExecutionPermit { probe: false }),
            CircuitState::Open => {
                let sleep_elapsed = {
                    let opened_at = self.opened_at.lock();
                    match *opened_at {
                        Some(opened_time) => opened_time.elapsed() >= self.config.sleep_window,
                        None => {
                            // Circuit is open but no timestamp - shouldn't happen
                            warn!(component = %self.name, "Circuit open but no timestamp recorded");
                            true
                        }
                    }
                };

                if sleep_elapsed && self.claim_probe() {
                    self.transition_to_half_open();
                    Admission::Allowed(ExecutionPermit { probe: true })
                } else {
                    Admission::ShortCircuited
                }
            }
            CircuitState::HalfOpen => {
                if self.claim_probe() {
                    Admission::Allowed(ExecutionPermit { probe: true })
                } else {
                    Admission::ShortCircuited
                }
            }
        }
    }

    /// Record the outcome of an admitted execution
    pub fn record(&self, permit: ExecutionPermit, outcome: Outcome, duration: Duration) {
        if permit.probe {
            self.probe_in_flight.store(false, Ordering::Release);
            match outcome {
                Outcome::Success => {
                    debug!(
                        component = %self.name,
                        duration_ms = duration.as_millis() as u64,
                        "🟢 Probe succeeded"
                    );
                    self.transition_to_closed();
                }
                _ => {
                    error!(
                        component = %self.name,
                        outcome = ?outcome,
                        duration_ms = duration.as_millis() as u64,
                        "🔴 Probe failed"
                    );
                    self.transition_to_open();
                }
            }
            return;
        }

        let now = Instant::now();
        let counts = {
            let mut window = self.window.lock();
            window.record(outcome, now);
            window.counts(now)
        };

        match outcome {
            Outcome::Success => {
                debug!(
                    component = %self.name,
                    duration_ms = duration.as_millis() as u64,
                    "🟢 Operation succeeded"
                );
            }
            _ => {
                warn!(
                    component = %self.name,
                    outcome = ?outcome,
                    duration_ms = duration.as_millis() as u64,
                    window_error_percentage = counts.error_percentage(),
                    "🔴 Operation failed"
                );
            }
        }

        if self.state() == CircuitState::Closed
            && counts.total() >= u64::from(self.config.request_volume_threshold)
            && counts.error_percentage() >= f64::from(self.config.error_threshold_percentage)
        {
            self.transition_to_open();
        }
    }

    /// Discard a permit without recording an outcome.
    ///
    /// Used for caller errors (bad requests): they must neither trip the
    /// breaker nor count toward the window.
    pub fn abandon(&self, permit: ExecutionPermit) {
        if permit.probe {
            // The probe was spent on a bad request; let the next caller probe
            self.probe_in_flight.store(false, Ordering::Release);
        }
    }

    fn claim_probe(&self) -> bool {
        self.probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transition to closed state (normal operation)
    fn transition_to_closed(&self) {
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        self.window.lock().reset(Instant::now());
        *self.opened_at.lock() = None;

        info!(component = %self.name, "🟢 Circuit breaker closed (recovered)");
    }

    /// Transition to open state (failing fast)
    fn transition_to_open(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        *self.opened_at.lock() = Some(Instant::now());

        error!(
            component = %self.name,
            sleep_window_ms = self.config.sleep_window.as_millis() as u64,
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    /// Transition to half-open state (testing recovery)
    fn transition_to_half_open(&self) {
        self.state
            .store(CircuitState::HalfOpen as u8, Ordering::Release);

        info!(component = %self.name, "🟡 Circuit breaker half-open (probing recovery)");
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        self.transition_to_open();
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        self.transition_to_closed();
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> BreakerMetrics {
        let counts = self.window.lock().counts(Instant::now());
        BreakerMetrics::from_counts(self.state(), counts)
    }

    /// Check if circuit is healthy (closed state with a low error rate)
    pub fn is_healthy(&self) -> bool {
        if self.state() != CircuitState::Closed {
            return false;
        }

        let counts = self.window.lock().counts(Instant::now());
        if counts.total() < 10 {
            // Too few calls to determine health
            return true;
        }

        counts.error_percentage() < 10.0
    }
}
