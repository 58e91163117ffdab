//! # Messaging Error Types
//!
//! Comprehensive error handling for the messaging system using thiserror
//! for structured error types instead of `Box<dyn Error>` patterns.

use crate::resilience::FailureClass;
use thiserror::Error;

/// Comprehensive messaging error types
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Channel unavailable: {message}")]
    ChannelUnavailable { message: String },

    #[error("Publish failed: {routing_key}: {message}")]
    Publish {
        routing_key: String,
        message: String,
    },

    #[error("Message returned by broker as unroutable: {routing_key}")]
    Returned { routing_key: String },

    #[error("Publish negatively confirmed by broker: {routing_key}")]
    Nacked { routing_key: String },

    #[error("Queue declaration failed: {queue_name}: {message}")]
    QueueDeclare { queue_name: String, message: String },

    #[error("Consume failed: {queue_name}: {message}")]
    Consume { queue_name: String, message: String },

    #[error("Acknowledgement failed: {queue_name}: {message}")]
    Acknowledge { queue_name: String, message: String },

    #[error("Malformed message payload: {message}")]
    MalformedPayload { message: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Internal messaging error: {message}")]
    Internal { message: String },
}

impl MessagingError {
    /// Create a broker connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a channel unavailable error
    pub fn channel_unavailable(message: impl Into<String>) -> Self {
        Self::ChannelUnavailable {
            message: message.into(),
        }
    }

    /// Create a publish error
    pub fn publish(routing_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            routing_key: routing_key.into(),
            message: message.into(),
        }
    }

    /// Create a returned-message error
    pub fn returned(routing_key: impl Into<String>) -> Self {
        Self::Returned {
            routing_key: routing_key.into(),
        }
    }

    /// Create a negative-confirmation error
    pub fn nacked(routing_key: impl Into<String>) -> Self {
        Self::Nacked {
            routing_key: routing_key.into(),
        }
    }

    /// Create a queue declaration error
    pub fn queue_declare(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueueDeclare {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    /// Create a consume error
    pub fn consume(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Consume {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    /// Create an acknowledgement error
    pub fn acknowledge(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Acknowledge {
            queue_name: queue_name.into(),
            message: message.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Create a message serialization error
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Broker failures are dependency failures, never caller errors: they must
/// count toward the circuit breaker window and resolve through fallbacks.
impl FailureClass for MessagingError {
    fn is_caller_error(&self) -> bool {
        false
    }
}

/// Conversion from serde_json::Error to MessagingError
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() {
            MessagingError::malformed_payload(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

/// Conversion from lapin::Error to MessagingError
impl From<lapin::Error> for MessagingError {
    fn from(err: lapin::Error) -> Self {
        match &err {
            lapin::Error::InvalidConnectionState(_) | lapin::Error::IOError(_) => {
                MessagingError::connection(err.to_string())
            }
            lapin::Error::InvalidChannelState(_) => {
                MessagingError::channel_unavailable(err.to_string())
            }
            _ => MessagingError::internal(err.to_string()),
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messaging_error_creation() {
        let conn_err = MessagingError::connection("Connection refused");
        assert!(matches!(conn_err, MessagingError::Connection { .. }));

        let publish_err = MessagingError::publish("statistics.adIsShown", "channel closed");
        assert!(matches!(publish_err, MessagingError::Publish { .. }));

        let returned_err = MessagingError::returned("statistics.adIsShown");
        assert!(matches!(returned_err, MessagingError::Returned { .. }));
    }

    #[test]
    fn test_error_display() {
        let publish_err = MessagingError::publish("statistics.adIsShown", "channel closed");
        let display_str = format!("{publish_err}");
        assert!(display_str.contains("Publish failed"));
        assert!(display_str.contains("statistics.adIsShown"));
        assert!(display_str.contains("channel closed"));
    }

    #[test]
    fn test_broker_errors_are_never_caller_errors() {
        assert!(!MessagingError::connection("down").is_caller_error());
        assert!(!MessagingError::returned("key").is_caller_error());
        assert!(!MessagingError::malformed_payload("not a number").is_caller_error());
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let messaging_err: MessagingError = json_err.into();
        assert!(matches!(
            messaging_err,
            MessagingError::MalformedPayload { .. }
        ));
    }
}
