//! # RabbitMQ Message Channel
//!
//! AMQP 0.9.1 implementation of [`MessageChannel`] using the `lapin` crate.
//!
//! ## Delivery guarantees
//!
//! - **Publisher confirms**: every publish waits for the broker's ack, so a
//!   resolved `publish` means the broker has taken responsibility
//! - **Mandatory routing**: unroutable messages come back as publisher
//!   returns and surface as [`MessagingError::Returned`] instead of being
//!   silently dropped
//! - **Channel cache**: publishes check channels out of a bounded cache so
//!   concurrent confirmed publishes do not serialize on a single channel
//! - **Manual acks**: consumers ack after the handler succeeds and reject
//!   without requeueing when it fails

use crate::config::RabbitmqConfig;
use crate::messaging::channel::{MessageChannel, MessageHandler};
use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::message::{InboundMessage, OutboundMessage, CORRELATION_HEADER};
use crate::correlation::CorrelationId;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{AMQPValue, FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tracing::{debug, error, info, warn};

/// RabbitMQ-backed message channel
pub struct RabbitMessageChannel {
    /// Broker connection shared by all channels
    connection: Connection,

    /// Idle confirmed channels available for checkout
    idle_channels: Mutex<Vec<Channel>>,

    /// Bounds the number of channels in use at once
    checkout_limit: Arc<Semaphore>,

    /// Queues already declared in this session
    declared_queues: RwLock<HashSet<String>>,

    config: RabbitmqConfig,
}

impl RabbitMessageChannel {
    /// Connect to the broker and prepare the channel cache.
    ///
    /// Channels are created lazily on first checkout; only the connection is
    /// established eagerly, bounded by the configured connection timeout.
    pub async fn connect(config: RabbitmqConfig) -> MessagingResult<Self> {
        let connection = tokio::time::timeout(
            config.connection_timeout(),
            Connection::connect(
                &config.url,
                ConnectionProperties::default().with_connection_name("bulletin-messaging".into()),
            ),
        )
        .await
        .map_err(|_| {
            MessagingError::connection(format!(
                "RabbitMQ connection timed out after {}s",
                config.connection_timeout_seconds
            ))
        })?
        .map_err(|e| MessagingError::connection(format!("RabbitMQ connection failed: {e}")))?;

        info!(
            channel_cache_size = config.channel_cache_size,
            prefetch_count = config.prefetch_count,
            "Connected to RabbitMQ"
        );

        Ok(Self {
            connection,
            idle_channels: Mutex::new(Vec::new()),
            checkout_limit: Arc::new(Semaphore::new(config.channel_cache_size)),
            declared_queues: RwLock::new(HashSet::new()),
            config,
        })
    }

    /// Configured prefetch count applied to consumer channels
    pub fn prefetch_count(&self) -> u16 {
        self.config.prefetch_count
    }

    /// Check a confirmed channel out of the cache, creating one if the cache
    /// is empty and the limit has not been reached
    async fn checkout_channel(&self) -> MessagingResult<Channel> {
        {
            let mut idle = self.idle_channels.lock().await;
            if let Some(channel) = idle.pop() {
                return Ok(channel);
            }
        }

        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| MessagingError::channel_unavailable(format!("channel creation failed: {e}")))?;

        // Confirm mode is per-channel and must be selected before first use
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| MessagingError::channel_unavailable(format!("confirm_select failed: {e}")))?;

        Ok(channel)
    }

    /// Return a healthy channel to the cache; broken channels are dropped
    async fn checkin_channel(&self, channel: Channel) {
        if channel.status().connected() {
            self.idle_channels.lock().await.push(channel);
        }
    }

    fn build_properties(message: &OutboundMessage) -> BasicProperties {
        let mut properties = BasicProperties::default()
            .with_delivery_mode(2) // Persistent
            .with_content_type(message.content_type.clone().into());

        if let Some(correlation_id) = &message.correlation_id {
            // Standard correlation-id property for AMQP-native consumers,
            // plus the header the HTTP side of the trace uses
            properties = properties.with_correlation_id(correlation_id.as_str().into());
            let mut headers = FieldTable::default();
            headers.insert(
                CORRELATION_HEADER.into(),
                AMQPValue::LongString(correlation_id.as_str().into()),
            );
            properties = properties.with_headers(headers);
        }

        if let Some(expiration) = message.expiration {
            // AMQP expiration is a string of milliseconds
            properties = properties.with_expiration(expiration.as_millis().to_string().into());
        }

        properties
    }

    fn extract_correlation_id(properties: &BasicProperties) -> Option<CorrelationId> {
        if let Some(correlation) = properties.correlation_id() {
            if let Some(id) = CorrelationId::from_header(correlation.as_str()) {
                return Some(id);
            }
        }

        // Older publishers carry the id only in the headers table
        let headers = properties.headers().as_ref()?;
        match headers.inner().get(&ShortString::from(CORRELATION_HEADER))? {
            AMQPValue::LongString(value) => std::str::from_utf8(value.as_bytes())
                .ok()
                .and_then(CorrelationId::from_header),
            _ => None,
        }
    }

    async fn handle_delivery(
        queue_name: &str,
        handler: &Arc<dyn MessageHandler>,
        delivery: Delivery,
    ) {
        let inbound = InboundMessage {
            queue_name: queue_name.to_string(),
            payload: delivery.data.clone(),
            correlation_id: Self::extract_correlation_id(&delivery.properties),
            redelivered: delivery.redelivered,
        };
        let correlation = inbound.correlation_for_logging().to_string();

        match handler.handle(inbound).await {
            Ok(()) => {
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    error!(queue = queue_name, error = %e, "Failed to ack message");
                }
            }
            Err(handler_error) => {
                warn!(
                    queue = queue_name,
                    correlation_id = %correlation,
                    error = %handler_error,
                    "Handler rejected message, discarding without requeue"
                );
                // Requeueing a poison message would loop it forever under
                // prefetch; the broker's dead-letter policy takes over
                let nack = delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await;
                if let Err(e) = nack {
                    error!(queue = queue_name, error = %e, "Failed to nack message");
                }
            }
        }
    }
}

#[async_trait]
impl MessageChannel for RabbitMessageChannel {
    async fn publish(&self, message: OutboundMessage) -> MessagingResult<()> {
        let _slot = self
            .checkout_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| MessagingError::channel_unavailable("channel cache closed"))?;

        let channel = self.checkout_channel().await?;
        let routing_key = message.routing_key.clone();
        let properties = Self::build_properties(&message);

        let publish_result = async {
            let confirm = channel
                .basic_publish(
                    "", // Default exchange: routing key addresses the queue
                    &routing_key,
                    BasicPublishOptions {
                        mandatory: true,
                        ..Default::default()
                    },
                    &message.payload,
                    properties,
                )
                .await
                .map_err(|e| MessagingError::publish(&routing_key, format!("publish failed: {e}")))?;

            let confirmation = confirm.await.map_err(|e| {
                MessagingError::publish(&routing_key, format!("confirmation failed: {e}"))
            })?;

            match confirmation {
                Confirmation::Ack(None) | Confirmation::NotRequested => Ok(()),
                Confirmation::Ack(Some(_returned)) => Err(MessagingError::returned(&routing_key)),
                Confirmation::Nack(_) => Err(MessagingError::nacked(&routing_key)),
            }
        }
        .await;

        match &publish_result {
            Ok(()) => {
                debug!(
                    routing_key = %routing_key,
                    bytes = message.payload.len(),
                    "Message confirmed by broker"
                );
                self.checkin_channel(channel).await;
            }
            Err(e) => {
                warn!(routing_key = %routing_key, error = %e, "Publish did not complete");
                self.checkin_channel(channel).await;
            }
        }

        publish_result
    }

    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        {
            let declared = self.declared_queues.read().await;
            if declared.contains(queue_name) {
                return Ok(());
            }
        }

        let channel = self.checkout_channel().await?;
        let declare_result = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::queue_declare(queue_name, format!("queue declaration failed: {e}"))
            });
        self.checkin_channel(channel).await;
        declare_result?;

        let mut declared = self.declared_queues.write().await;
        declared.insert(queue_name.to_string());

        Ok(())
    }

    async fn subscribe(
        &self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> MessagingResult<()> {
        self.ensure_queue(queue_name).await?;

        // Consumers get a dedicated channel so handler latency never blocks
        // the publisher cache
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| MessagingError::consume(queue_name, format!("channel creation failed: {e}")))?;

        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| MessagingError::consume(queue_name, format!("basic_qos failed: {e}")))?;

        let mut consumer = channel
            .basic_consume(
                queue_name,
                &format!("bulletin-{queue_name}"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::consume(queue_name, format!("basic_consume failed: {e}")))?;

        info!(
            queue = queue_name,
            prefetch = self.config.prefetch_count,
            "Consumer attached"
        );

        let queue = queue_name.to_string();
        tokio::spawn(async move {
            // Keep the channel alive for the lifetime of the consumer loop
            let _channel = channel;
            while let Some(delivery) = consumer.next().await {
                match delivery {
                    Ok(delivery) => Self::handle_delivery(&queue, &handler, delivery).await,
                    Err(e) => {
                        error!(queue = %queue, error = %e, "Consumer stream error");
                    }
                }
            }
            warn!(queue = %queue, "Consumer stream ended");
        });

        Ok(())
    }
}

impl std::fmt::Debug for RabbitMessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabbitMessageChannel")
            .field("channel_cache_size", &self.config.channel_cache_size)
            .field("prefetch_count", &self.config.prefetch_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_sets_standard_correlation_property() {
        let message = OutboundMessage::text("statistics.adIsShown", "7")
            .with_correlation_id(CorrelationId::from_header("corr-42").unwrap());

        let properties = RabbitMessageChannel::build_properties(&message);

        assert_eq!(
            properties.correlation_id().as_ref().map(|s| s.as_str()),
            Some("corr-42")
        );
        // The header travels alongside the standard property
        let headers = properties.headers().as_ref().unwrap();
        assert!(headers
            .inner()
            .contains_key(&ShortString::from(CORRELATION_HEADER)));
    }

    #[test]
    fn test_extract_prefers_standard_correlation_property() {
        let properties = BasicProperties::default().with_correlation_id("corr-42".into());

        let extracted = RabbitMessageChannel::extract_correlation_id(&properties).unwrap();
        assert_eq!(extracted.as_str(), "corr-42");
    }

    #[test]
    fn test_extract_falls_back_to_header() {
        let mut headers = FieldTable::default();
        headers.insert(
            CORRELATION_HEADER.into(),
            AMQPValue::LongString("corr-43".into()),
        );
        let properties = BasicProperties::default().with_headers(headers);

        let extracted = RabbitMessageChannel::extract_correlation_id(&properties).unwrap();
        assert_eq!(extracted.as_str(), "corr-43");
    }

    #[test]
    fn test_extract_without_correlation_is_none() {
        let properties = BasicProperties::default();
        assert!(RabbitMessageChannel::extract_correlation_id(&properties).is_none());
    }

    // Integration tests require RabbitMQ to be running
    // Run with: docker compose up -d rabbitmq
    // Then: cargo test rabbit -- --ignored

    #[tokio::test]
    #[ignore = "requires RabbitMQ running"]
    async fn test_connect_and_declare() {
        let channel = RabbitMessageChannel::connect(RabbitmqConfig::default())
            .await
            .unwrap();

        let queue_name = format!("test_declare_{}", uuid::Uuid::new_v4());
        channel.ensure_queue(&queue_name).await.unwrap();

        // Idempotent
        channel.ensure_queue(&queue_name).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires RabbitMQ running"]
    async fn test_publish_confirmed_roundtrip() {
        let channel = RabbitMessageChannel::connect(RabbitmqConfig::default())
            .await
            .unwrap();

        let queue_name = format!("test_publish_{}", uuid::Uuid::new_v4());
        channel.ensure_queue(&queue_name).await.unwrap();

        let message = OutboundMessage::text(&queue_name, "7")
            .with_correlation_id(crate::correlation::CorrelationId::generate());
        channel.publish(message).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires RabbitMQ running"]
    async fn test_unroutable_message_is_returned() {
        let channel = RabbitMessageChannel::connect(RabbitmqConfig::default())
            .await
            .unwrap();

        let missing_queue = format!("test_missing_{}", uuid::Uuid::new_v4());
        let result = channel
            .publish(OutboundMessage::text(&missing_queue, "7"))
            .await;

        assert!(matches!(result, Err(MessagingError::Returned { .. })));
    }
}
