//! # Increment Counter Listener
//!
//! Consumes single advertisement-view events and bumps the corresponding
//! counter. The message body is the advertisement id as a UTF-8 decimal
//! string; anything else is logged and acknowledged without counting, so a
//! malformed event can never wedge the queue.

use crate::messaging::{InboundMessage, MessageHandler, MessagingResult};
use crate::statistics::counter::StatisticsCounter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Handler for `statistics.adIsShown` events
#[derive(Debug)]
pub struct IncrementCounterListener {
    counter: Arc<StatisticsCounter>,
}

impl IncrementCounterListener {
    pub fn new(counter: Arc<StatisticsCounter>) -> Self {
        Self { counter }
    }

    fn parse_advertisement_id(message: &InboundMessage) -> Option<i64> {
        message.payload_str()?.trim().parse::<i64>().ok()
    }
}

#[async_trait]
impl MessageHandler for IncrementCounterListener {
    async fn handle(&self, message: InboundMessage) -> MessagingResult<()> {
        let Some(advertisement_id) = Self::parse_advertisement_id(&message) else {
            warn!(
                correlation_id = %message.correlation_for_logging(),
                "received message can not be processed as it is not a number"
            );
            return Ok(());
        };

        let stats = self.counter.increment(advertisement_id);

        info!(
            advertisement_id,
            views = stats.views,
            correlation_id = %message.correlation_for_logging(),
            "received increment for advertisement"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(body: &[u8]) -> InboundMessage {
        InboundMessage {
            queue_name: "statistics.adIsShown".to_string(),
            payload: body.to_vec(),
            correlation_id: None,
            redelivered: false,
        }
    }

    #[tokio::test]
    async fn test_increments_counter_for_numeric_payload() {
        let counter = Arc::new(StatisticsCounter::new());
        let listener = IncrementCounterListener::new(Arc::clone(&counter));

        listener.handle(event(b"7")).await.unwrap();
        listener.handle(event(b"7")).await.unwrap();
        listener.handle(event(b" 9 ")).await.unwrap();

        assert_eq!(counter.get(7).views, 2);
        assert_eq!(counter.get(9).views, 1);
    }

    #[tokio::test]
    async fn test_non_numeric_payload_is_acked_without_counting() {
        let counter = Arc::new(StatisticsCounter::new());
        let listener = IncrementCounterListener::new(Arc::clone(&counter));

        listener.handle(event(b"not-a-number")).await.unwrap();
        assert_eq!(counter.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_acked_without_counting() {
        let counter = Arc::new(StatisticsCounter::new());
        let listener = IncrementCounterListener::new(Arc::clone(&counter));

        listener.handle(event(&[0xff, 0xfe])).await.unwrap();
        assert_eq!(counter.tracked_count(), 0);
    }
}
