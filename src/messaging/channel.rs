//! # Message Channel Abstraction
//!
//! The seam between domain code and the broker. Production wires up the
//! AMQP implementation; tests substitute the in-memory channel and assert
//! on the messages that crossed the seam.

use crate::messaging::errors::MessagingResult;
use crate::messaging::message::{InboundMessage, OutboundMessage};
use async_trait::async_trait;
use std::sync::Arc;

/// Outbound side of the broker seam.
///
/// `publish` resolves only once the broker has taken responsibility for the
/// message: implementations with publisher confirms must await the confirm
/// and surface returned or negatively-confirmed messages as errors.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Publish a message, waiting for broker acknowledgement
    async fn publish(&self, message: OutboundMessage) -> MessagingResult<()>;

    /// Declare a durable queue, idempotently
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()>;

    /// Attach a handler consuming from a queue.
    ///
    /// Delivery semantics are at-least-once: a handler returning `Ok`
    /// acknowledges the message; a handler returning `Err` rejects it
    /// without requeueing, leaving redelivery policy to the broker.
    async fn subscribe(
        &self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> MessagingResult<()>;
}

/// Processes messages delivered from a subscribed queue
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> MessagingResult<()>;
}
