#![allow(clippy::doc_markdown)] // Allow technical terms like RabbitMQ, AMQP in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Bulletin Core Rust
//!
//! Resilient outbound-call layer for the bulletin board advertisements
//! service and its statistics companion.
//!
//! ## Overview
//!
//! The advertisements service depends on two remote systems: the user
//! service (synchronous HTTP, premium-status lookups) and the statistics
//! service (asynchronous AMQP, view counting). Both dependencies are
//! unreliable by assumption, and neither is allowed to take the
//! advertisements service down with it. This crate provides the machinery
//! that enforces that:
//!
//! - **Circuit breaker commands**: every outbound call runs as a one-shot
//!   command with a timeout, a fallback value, bounded concurrency per
//!   dependency, and rolling-window error-rate circuit breaking
//! - **Confirmed publishing**: view events and periodic statistics go out
//!   over AMQP with publisher confirms and mandatory routing, so silent
//!   message loss is an error, not a mystery
//! - **Explicit correlation**: a correlation id captured at the request edge
//!   travels on every HTTP call and broker message, joining the logs of all
//!   three services
//!
//! ## Module Organization
//!
//! - [`resilience`] - Circuit breakers, commands, registry, metrics
//! - [`services`] - User service and statistics service clients
//! - [`messaging`] - Broker abstraction, AMQP implementation, test channel
//! - [`statistics`] - View counters, consumers, periodic sender
//! - [`config`] - Configuration loading and validation
//! - [`correlation`] - Correlation id capture and propagation
//! - [`constants`] - Routing keys, queue names, header names
//! - [`logging`] - Structured logging initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulletin_core::config::BulletinConfig;
//! use bulletin_core::correlation::CorrelationId;
//! use bulletin_core::messaging::RabbitMessageChannel;
//! use bulletin_core::resilience::CircuitBreakerRegistry;
//! use bulletin_core::services::{StatisticsServiceClient, UserServiceClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! bulletin_core::logging::init_structured_logging();
//!
//! let config = BulletinConfig::load()?;
//! let registry = Arc::new(CircuitBreakerRegistry::from_settings(&config.circuit_breaker));
//!
//! let channel = Arc::new(RabbitMessageChannel::connect(config.rabbitmq.clone()).await?);
//! let users = UserServiceClient::new(config.user_service.clone(), Arc::clone(&registry))?;
//! let statistics = StatisticsServiceClient::new(channel, registry);
//! statistics.prepare().await?;
//!
//! // Per request: capture the correlation id once, pass it everywhere
//! let correlation_id = CorrelationId::generate();
//! let premium = users.is_premium_user(42, &correlation_id).await?;
//! let _ = statistics.advertisement_is_shown(7, &correlation_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod correlation;
pub mod logging;
pub mod messaging;
pub mod resilience;
pub mod services;
pub mod statistics;

pub use config::BulletinConfig;
pub use correlation::CorrelationId;
pub use messaging::{
    InMemoryMessageChannel, MessageChannel, MessageHandler, MessagingError, OutboundMessage,
    RabbitMessageChannel,
};
pub use resilience::{
    CircuitBreaker, CircuitBreakerRegistry, CircuitCommand, CircuitState, CommandError,
    CommandKey, CommandState,
};
pub use services::{StatisticsServiceClient, UserServiceClient, UserServiceError};
pub use statistics::{
    IncrementCounterListener, PeriodicStatisticsSender, StatisticsCounter, StatisticsListener,
};
