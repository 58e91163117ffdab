//! # Outbound Service Clients
//!
//! Clients for the advertisements service's remote dependencies. Every call
//! leaves the process through a [`crate::resilience::CircuitCommand`], so a
//! degraded dependency costs at most one timeout and then fails fast.

pub mod statistics_client;
pub mod user_service;

pub use statistics_client::StatisticsServiceClient;
pub use user_service::{UserServiceClient, UserServiceError};
