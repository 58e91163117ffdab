//! # Statistics Service Client
//!
//! Fire-and-forget publisher of advertisement-view events. Recording a view
//! must never slow down or fail the request that showed the advertisement:
//! the publish runs on its own task behind a circuit breaker, and every
//! failure mode resolves by dropping the event.

use crate::constants::routing;
use crate::correlation::CorrelationId;
use crate::messaging::{MessageChannel, MessagingError, MessagingResult, OutboundMessage};
use crate::resilience::{CircuitBreakerRegistry, CircuitCommand, CommandKey};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Publishes `statistics.adIsShown` events for the statistics consumer
#[derive(Clone)]
pub struct StatisticsServiceClient {
    channel: Arc<dyn MessageChannel>,
    registry: Arc<CircuitBreakerRegistry>,
}

impl StatisticsServiceClient {
    /// Command key under which view-event publishes share circuit state
    pub fn command_key() -> CommandKey {
        CommandKey::new("statistics", "statistics.adIsShown")
    }

    pub fn new(channel: Arc<dyn MessageChannel>, registry: Arc<CircuitBreakerRegistry>) -> Self {
        Self { channel, registry }
    }

    /// Declare the view-event queue so publishes with the mandatory flag
    /// have somewhere to route
    pub async fn prepare(&self) -> MessagingResult<()> {
        self.channel.ensure_queue(routing::AD_IS_SHOWN).await
    }

    /// Record that an advertisement was shown.
    ///
    /// Returns immediately; the publish happens asynchronously. The handle
    /// resolves once the event is confirmed or dropped, and callers that do
    /// not care (the normal case) simply discard it. A lost view count is
    /// acceptable; a delayed advertisement response is not.
    pub fn advertisement_is_shown(
        &self,
        advertisement_id: i64,
        correlation_id: &CorrelationId,
    ) -> JoinHandle<()> {
        let command = CircuitCommand::new(Arc::clone(&self.registry), Self::command_key());
        let channel = Arc::clone(&self.channel);
        let correlation = correlation_id.clone();

        tokio::spawn(async move {
            // Publishing can never produce a caller error, so the command
            // result carries no information beyond what was already logged
            let _ = command
                .execute::<(), MessagingError, _, _, _>(
                    move || async move {
                        let message =
                            OutboundMessage::text(routing::AD_IS_SHOWN, advertisement_id.to_string())
                                .with_correlation_id(correlation);
                        channel.publish(message).await
                    },
                    move || {
                        warn!(advertisement_id, "dropping view event, statistics unavailable");
                    },
                )
                .await;
        })
    }
}
