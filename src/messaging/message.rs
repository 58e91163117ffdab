//! # Message Types
//!
//! Broker-neutral message envelopes. The AMQP channel translates these into
//! wire properties; tests inspect them directly through the in-memory
//! channel without touching a broker.

use crate::constants::headers;
use crate::correlation::CorrelationId;
use crate::messaging::errors::MessagingResult;
use serde::Serialize;
use std::time::Duration;

/// A message handed to a [`crate::messaging::MessageChannel`] for delivery
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Routing key (queue name when publishing through the default exchange)
    pub routing_key: String,

    /// Serialized payload bytes
    pub payload: Vec<u8>,

    /// MIME content type of the payload
    pub content_type: String,

    /// Correlation id captured at submission, carried as a message header
    pub correlation_id: Option<CorrelationId>,

    /// Broker-side time-to-live; expired messages are dropped, not delivered
    pub expiration: Option<Duration>,
}

impl OutboundMessage {
    /// Create a plain-text message
    pub fn text(routing_key: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            routing_key: routing_key.into(),
            payload: body.into().into_bytes(),
            content_type: "text/plain".to_string(),
            correlation_id: None,
            expiration: None,
        }
    }

    /// Create a JSON message from a serializable value
    pub fn json<T: Serialize>(routing_key: impl Into<String>, value: &T) -> MessagingResult<Self> {
        Ok(Self {
            routing_key: routing_key.into(),
            payload: serde_json::to_vec(value)?,
            content_type: "application/json".to_string(),
            correlation_id: None,
            expiration: None,
        })
    }

    /// Attach the correlation id of the originating request
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Set a broker-side expiration for the message
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Payload interpreted as UTF-8, for logging and tests
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// A message delivered to a [`crate::messaging::MessageHandler`]
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Queue the message was consumed from
    pub queue_name: String,

    /// Raw payload bytes
    pub payload: Vec<u8>,

    /// Correlation id extracted from the message headers, if present
    pub correlation_id: Option<CorrelationId>,

    /// Whether the broker has delivered this message before
    pub redelivered: bool,
}

impl InboundMessage {
    /// Payload interpreted as UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Correlation id as a displayable string for log fields
    pub fn correlation_for_logging(&self) -> &str {
        self.correlation_id
            .as_ref()
            .map(CorrelationId::as_str)
            .unwrap_or("-")
    }
}

/// Header name under which the correlation id travels
pub const CORRELATION_HEADER: &str = headers::CORRELATION_ID;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let message = OutboundMessage::text("statistics.adIsShown", "7");
        assert_eq!(message.routing_key, "statistics.adIsShown");
        assert_eq!(message.payload_str(), Some("7"));
        assert_eq!(message.content_type, "text/plain");
        assert!(message.correlation_id.is_none());
    }

    #[test]
    fn test_json_message() {
        let message = OutboundMessage::json(
            "statistics.periodicalStatistics",
            &serde_json::json!({"advertisementId": 7, "views": 3}),
        )
        .unwrap();

        assert_eq!(message.content_type, "application/json");
        let parsed: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(parsed["views"], 3);
    }

    #[test]
    fn test_builder_attachments() {
        let correlation_id = CorrelationId::generate();
        let message = OutboundMessage::text("statistics.adIsShown", "7")
            .with_correlation_id(correlation_id.clone())
            .with_expiration(Duration::from_secs(15));

        assert_eq!(message.correlation_id, Some(correlation_id));
        assert_eq!(message.expiration, Some(Duration::from_secs(15)));
    }
}
