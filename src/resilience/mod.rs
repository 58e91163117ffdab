//! # Resilience
//!
//! Circuit breaker protection for outbound calls.
//!
//! Every call to a remote dependency goes through a [`CircuitCommand`]: a
//! one-shot wrapper that enforces a timeout, substitutes a fallback value on
//! failure, limits concurrency per dependency group, and short-circuits
//! entirely once the recent error rate crosses the configured threshold.
//!
//! The moving parts:
//!
//! - [`CircuitBreaker`] — per-command state machine (closed, open, half-open)
//!   driven by a rolling error-rate window
//! - [`CircuitBreakerRegistry`] — explicitly-owned collection of breakers and
//!   bounded execution pools, shared across clients
//! - [`CircuitCommand`] — the execution wrapper clients actually use
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bulletin_core::resilience::{CircuitBreakerRegistry, CircuitCommand, CommandKey};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[derive(Debug)] struct DepError;
//! # impl bulletin_core::resilience::FailureClass for DepError {}
//! # async fn example() {
//! let registry = Arc::new(CircuitBreakerRegistry::default());
//!
//! let premium = CircuitCommand::new(registry, CommandKey::new("user", "user.is_premium"))
//!     .with_timeout(Duration::from_millis(500))
//!     .execute(
//!         || async { Ok::<_, DepError>(true) },
//!         || false, // degrade to non-premium when the user service is down
//!     )
//!     .await;
//! # }
//! ```

pub mod circuit_breaker;
pub mod command;
pub mod config;
pub mod metrics;
pub mod registry;
pub mod window;

pub use circuit_breaker::{Admission, CircuitBreaker, CircuitState, ExecutionPermit};
pub use command::{CircuitCommand, CommandError, CommandState, FailureClass};
pub use config::BreakerConfig;
pub use metrics::{BreakerMetrics, RegistryMetrics};
pub use registry::{CircuitBreakerRegistry, CommandKey};
pub use window::{Outcome, RollingWindow, WindowCounts};
