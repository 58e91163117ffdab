//! # In-Memory Message Channel
//!
//! Broker-free [`MessageChannel`] used by tests. Published messages are
//! recorded for inspection and dispatched synchronously to any subscribed
//! handlers, so a publish-consume flow can be exercised in a single test
//! without a running broker.

use crate::messaging::channel::{MessageChannel, MessageHandler};
use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::message::{InboundMessage, OutboundMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Recording, dispatching message channel with no broker behind it
#[derive(Default)]
pub struct InMemoryMessageChannel {
    published: Mutex<Vec<OutboundMessage>>,
    declared_queues: Mutex<HashSet<String>>,
    handlers: RwLock<HashMap<String, Vec<Arc<dyn MessageHandler>>>>,
    broker_down: AtomicBool,
    rejected: AtomicU64,
}

impl InMemoryMessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages published so far, in order
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.published.lock().clone()
    }

    /// Messages published with the given routing key
    pub fn published_to(&self, routing_key: &str) -> Vec<OutboundMessage> {
        self.published
            .lock()
            .iter()
            .filter(|message| message.routing_key == routing_key)
            .cloned()
            .collect()
    }

    /// Queues declared through `ensure_queue`
    pub fn declared_queues(&self) -> HashSet<String> {
        self.declared_queues.lock().clone()
    }

    /// Number of deliveries rejected by handlers
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Simulate a broker outage: publishes fail until restored
    pub fn set_broker_down(&self, down: bool) {
        self.broker_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageChannel for InMemoryMessageChannel {
    async fn publish(&self, message: OutboundMessage) -> MessagingResult<()> {
        if self.broker_down.load(Ordering::SeqCst) {
            return Err(MessagingError::connection("broker unavailable"));
        }

        let inbound = InboundMessage {
            queue_name: message.routing_key.clone(),
            payload: message.payload.clone(),
            correlation_id: message.correlation_id.clone(),
            redelivered: false,
        };

        self.published.lock().push(message.clone());

        let handlers = {
            let all = self.handlers.read().await;
            all.get(&message.routing_key).cloned().unwrap_or_default()
        };
        for handler in handlers {
            if handler.handle(inbound.clone()).await.is_err() {
                self.rejected.fetch_add(1, Ordering::SeqCst);
            }
        }

        Ok(())
    }

    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.declared_queues.lock().insert(queue_name.to_string());
        Ok(())
    }

    async fn subscribe(
        &self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> MessagingResult<()> {
        self.ensure_queue(queue_name).await?;
        let mut handlers = self.handlers.write().await;
        handlers
            .entry(queue_name.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryMessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageChannel")
            .field("published", &self.published.lock().len())
            .field("declared_queues", &self.declared_queues.lock().len())
            .finish()
    }
}
