//! Integration tests for the user service client against a mock HTTP server.
//!
//! Exercises the degradation paths that matter in production: fallback on
//! server errors, fast fallback on slow responses, bad-request propagation,
//! and circuit breaking under sustained failure.

use bulletin_core::config::{BreakerSettingsEntry, CircuitBreakerSettings, UserServiceConfig};
use bulletin_core::correlation::CorrelationId;
use bulletin_core::resilience::{CircuitBreakerRegistry, CircuitState, CommandError};
use bulletin_core::services::UserServiceClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server_uri: &str, registry: Arc<CircuitBreakerRegistry>) -> UserServiceClient {
    UserServiceClient::new(
        UserServiceConfig {
            route: server_uri.to_string(),
            timeout_ms: 250,
            premium_fallback: false,
        },
        registry,
    )
    .expect("client construction")
}

fn sensitive_registry() -> Arc<CircuitBreakerRegistry> {
    // Low volume threshold so a handful of failures opens the circuit
    let settings = CircuitBreakerSettings {
        enabled: true,
        default: BreakerSettingsEntry {
            request_volume_threshold: 2,
            sleep_window_ms: 60_000,
            ..Default::default()
        },
        commands: HashMap::new(),
    };
    Arc::new(CircuitBreakerRegistry::from_settings(&settings))
}

#[tokio::test]
async fn premium_status_is_returned_and_correlation_header_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1.0/users/42"))
        .and(header_exists("X-CorrelationID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "premiumUser": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Arc::new(CircuitBreakerRegistry::default()));
    let correlation_id = CorrelationId::generate();

    let premium = client.is_premium_user(42, &correlation_id).await.unwrap();
    assert!(premium);
}

#[tokio::test]
async fn server_error_resolves_to_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Arc::new(CircuitBreakerRegistry::default()));

    let premium = client
        .is_premium_user(42, &CorrelationId::generate())
        .await
        .unwrap();
    assert!(!premium);
}

#[tokio::test]
async fn client_error_propagates_without_fallback_or_breaker_bookkeeping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = Arc::new(CircuitBreakerRegistry::default());
    let client = client_for(&server.uri(), Arc::clone(&registry));

    let result = client.is_premium_user(42, &CorrelationId::generate()).await;
    assert!(matches!(result, Err(CommandError::BadRequest(_))));

    // The bad request left no trace in the rolling window
    let metrics = registry
        .command_metrics(&UserServiceClient::command_key())
        .await
        .expect("breaker exists after first call");
    assert_eq!(metrics.total_calls, 0);
}

#[tokio::test]
async fn slow_user_service_falls_back_within_the_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"premiumUser": true}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Arc::new(CircuitBreakerRegistry::default()));

    let started = Instant::now();
    let premium = client
        .is_premium_user(42, &CorrelationId::generate())
        .await
        .unwrap();

    // Fallback, and well before the mock's 2s delay
    assert!(!premium);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn sustained_failures_open_the_circuit_and_stop_outbound_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = sensitive_registry();
    let client = client_for(&server.uri(), Arc::clone(&registry));

    // Enough failures to cross the volume and error-rate thresholds
    for _ in 0..3 {
        let premium = client
            .is_premium_user(42, &CorrelationId::generate())
            .await
            .unwrap();
        assert!(!premium);
    }

    let breaker = registry.breaker(&UserServiceClient::command_key()).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    let requests_before = server.received_requests().await.unwrap().len();

    // Short-circuited calls still resolve to the fallback, without hitting
    // the wire
    for _ in 0..5 {
        let premium = client
            .is_premium_user(42, &CorrelationId::generate())
            .await
            .unwrap();
        assert!(!premium);
    }

    let requests_after = server.received_requests().await.unwrap().len();
    assert_eq!(requests_before, requests_after);
}
