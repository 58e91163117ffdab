//! End-to-end statistics flow over the in-memory channel: view events
//! published by the advertisements side, consumed and counted by the
//! statistics side, and aggregated snapshots flowing back.

use bulletin_core::config::StatisticsConfig;
use bulletin_core::constants::routing;
use bulletin_core::correlation::CorrelationId;
use bulletin_core::messaging::{InMemoryMessageChannel, MessageChannel, OutboundMessage};
use bulletin_core::resilience::CircuitBreakerRegistry;
use bulletin_core::services::StatisticsServiceClient;
use bulletin_core::statistics::{
    IncrementCounterListener, PeriodicStatisticsSender, StatisticsCounter, StatisticsListener,
    ViewStatistics,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn view_events_flow_from_publisher_to_counter() {
    let channel = Arc::new(InMemoryMessageChannel::new());
    let counter = Arc::new(StatisticsCounter::new());

    // Statistics side: consume view events
    channel
        .subscribe(
            routing::AD_IS_SHOWN,
            Arc::new(IncrementCounterListener::new(Arc::clone(&counter))),
        )
        .await
        .unwrap();

    // Advertisements side: record views
    let client = StatisticsServiceClient::new(
        Arc::clone(&channel) as Arc<dyn MessageChannel>,
        Arc::new(CircuitBreakerRegistry::default()),
    );
    let correlation_id = CorrelationId::generate();

    client.advertisement_is_shown(7, &correlation_id).await.unwrap();
    client.advertisement_is_shown(7, &correlation_id).await.unwrap();
    client.advertisement_is_shown(9, &correlation_id).await.unwrap();

    assert_eq!(counter.get(7).views, 2);
    assert_eq!(counter.get(9).views, 1);

    // The wire messages carry the id as plain text plus the correlation id
    let published = channel.published_to(routing::AD_IS_SHOWN);
    assert_eq!(published.len(), 3);
    assert_eq!(published[0].payload_str(), Some("7"));
    assert_eq!(published[0].correlation_id, Some(correlation_id));
}

#[tokio::test]
async fn malformed_view_event_is_discarded_without_counting() {
    let channel = Arc::new(InMemoryMessageChannel::new());
    let counter = Arc::new(StatisticsCounter::new());
    channel
        .subscribe(
            routing::AD_IS_SHOWN,
            Arc::new(IncrementCounterListener::new(Arc::clone(&counter))),
        )
        .await
        .unwrap();

    channel
        .publish(OutboundMessage::text(routing::AD_IS_SHOWN, "not-a-number"))
        .await
        .unwrap();

    // Acked without counting, never rejected back to the broker
    assert_eq!(channel.rejected_count(), 0);
    assert_eq!(counter.tracked_count(), 0);
}

#[tokio::test]
async fn periodic_snapshots_reach_the_advertisements_listener() {
    let channel = Arc::new(InMemoryMessageChannel::new());
    let counter = Arc::new(StatisticsCounter::new());
    counter.increment(7);
    counter.increment(7);

    // Advertisements side: log incoming snapshots (acks everything)
    channel
        .subscribe(
            routing::PERIODICAL_STATISTICS_QUEUE,
            Arc::new(StatisticsListener::new()),
        )
        .await
        .unwrap();

    let sender = PeriodicStatisticsSender::new(
        Arc::clone(&channel) as Arc<dyn MessageChannel>,
        Arc::clone(&counter),
        StatisticsConfig {
            send_interval_seconds: 5,
        },
    );
    sender.publish_snapshot().await.unwrap();

    let published = channel.published_to(routing::PERIODICAL_STATISTICS_QUEUE);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].expiration, Some(Duration::from_secs(15)));
    assert_eq!(channel.rejected_count(), 0);

    let snapshot: ViewStatistics = serde_json::from_slice(&published[0].payload).unwrap();
    assert_eq!(snapshot.advertisement_id, 7);
    assert_eq!(snapshot.views, 2);
}

#[tokio::test]
async fn broker_outage_never_surfaces_to_the_advertisement_path() {
    let channel = Arc::new(InMemoryMessageChannel::new());
    channel.set_broker_down(true);

    let client = StatisticsServiceClient::new(
        Arc::clone(&channel) as Arc<dyn MessageChannel>,
        Arc::new(CircuitBreakerRegistry::default()),
    );

    // Fire-and-forget resolves cleanly; the view is simply lost
    client
        .advertisement_is_shown(7, &CorrelationId::generate())
        .await
        .unwrap();
    assert!(channel.published().is_empty());
}
