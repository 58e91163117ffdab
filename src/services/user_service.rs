//! # User Service Client
//!
//! HTTP client for the user service's premium-status lookup, protected by a
//! circuit breaker command. The advertisements service degrades gracefully
//! when the user service misbehaves: slow or failing lookups resolve to the
//! configured fallback instead of blocking ad creation.
//!
//! A 4xx response is the caller's fault, not the dependency's: it bypasses
//! the fallback, propagates as an error, and leaves the breaker untouched.

use crate::config::UserServiceConfig;
use crate::constants::{headers, user_service};
use crate::correlation::CorrelationId;
use crate::resilience::{
    CircuitBreakerRegistry, CircuitCommand, CommandError, CommandKey, FailureClass,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from the user service dependency
#[derive(Error, Debug)]
pub enum UserServiceError {
    #[error("User service request failed: {message}")]
    Request { message: String },

    #[error("User service rejected the request with client error status {status}")]
    UnsuccessfulRequest { status: u16 },

    #[error("User service returned server error status {status}")]
    ServerError { status: u16 },

    #[error("User service response could not be parsed: {message}")]
    MalformedResponse { message: String },

    #[error("HTTP client could not be constructed: {message}")]
    Client { message: String },
}

impl UserServiceError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn unsuccessful_request(status: u16) -> Self {
        Self::UnsuccessfulRequest { status }
    }

    pub fn server_error(status: u16) -> Self {
        Self::ServerError { status }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
        }
    }
}

impl FailureClass for UserServiceError {
    fn is_caller_error(&self) -> bool {
        matches!(self, UserServiceError::UnsuccessfulRequest { .. })
    }
}

/// Wire shape of the user service's response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumUserResponse {
    premium_user: bool,
}

/// Client for `GET {route}/api/v1.0/users/{id}`
#[derive(Debug, Clone)]
pub struct UserServiceClient {
    http: reqwest::Client,
    config: UserServiceConfig,
    registry: Arc<CircuitBreakerRegistry>,
}

impl UserServiceClient {
    /// Command key under which premium lookups share circuit state
    pub fn command_key() -> CommandKey {
        CommandKey::new("user", "user.isPremium")
    }

    pub fn new(
        config: UserServiceConfig,
        registry: Arc<CircuitBreakerRegistry>,
    ) -> Result<Self, UserServiceError> {
        // The command timeout governs caller latency. The client-level
        // timeout is a hard upper bound on the whole exchange, so a call
        // that outlives its command cannot hold the detached task forever
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Self::hard_timeout(&config))
            .build()
            .map_err(|e| UserServiceError::client(e.to_string()))?;

        Ok(Self {
            http,
            config,
            registry,
        })
    }

    /// Whether the user may use premium features.
    ///
    /// Resolves to the configured fallback when the user service is slow,
    /// failing, or short-circuited. Only a client-error response from the
    /// user service surfaces as `Err`.
    pub async fn is_premium_user(
        &self,
        user_id: i64,
        correlation_id: &CorrelationId,
    ) -> Result<bool, CommandError<UserServiceError>> {
        let url = self.request_url(user_id);
        let http = self.http.clone();
        let correlation = correlation_id.clone();
        let fallback_value = self.config.premium_fallback;

        debug!(user_id, url = %url, correlation_id = %correlation, "checking premium status");

        CircuitCommand::new(Arc::clone(&self.registry), Self::command_key())
            .with_timeout(self.config.timeout())
            .execute(
                move || async move {
                    let response = http
                        .get(&url)
                        .header(headers::CORRELATION_ID, correlation.as_str())
                        .send()
                        .await
                        .map_err(|e| UserServiceError::request(e.to_string()))?;

                    let status = response.status();
                    if status.is_client_error() {
                        return Err(UserServiceError::unsuccessful_request(status.as_u16()));
                    }
                    if !status.is_success() {
                        return Err(UserServiceError::server_error(status.as_u16()));
                    }

                    let body: PremiumUserResponse = response
                        .json()
                        .await
                        .map_err(|e| UserServiceError::malformed_response(e.to_string()))?;

                    Ok(body.premium_user)
                },
                move || fallback_value,
            )
            .await
    }

    /// Upper bound on any single HTTP exchange, including the detached
    /// continuation of a call whose command already timed out
    fn hard_timeout(config: &UserServiceConfig) -> Duration {
        config.timeout() * 3
    }

    fn request_url(&self, user_id: i64) -> String {
        format!(
            "{}/{}/{}",
            self.config.route.trim_end_matches('/'),
            user_service::USERS_PATH,
            user_id
        )
    }
}
