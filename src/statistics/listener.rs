//! # Statistics Listener
//!
//! Advertisements-side consumer for the periodic statistics queue. The
//! snapshots are informational; the listener logs them and acknowledges.

use crate::messaging::{InboundMessage, MessageHandler, MessagingResult};
use async_trait::async_trait;
use tracing::info;

/// Logs periodic statistics snapshots as they arrive
#[derive(Debug, Default)]
pub struct StatisticsListener;

impl StatisticsListener {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageHandler for StatisticsListener {
    async fn handle(&self, message: InboundMessage) -> MessagingResult<()> {
        info!(
            queue = %message.queue_name,
            correlation_id = %message.correlation_for_logging(),
            body = message.payload_str().unwrap_or("<non-utf8>"),
            "got statistics"
        );
        Ok(())
    }
}
