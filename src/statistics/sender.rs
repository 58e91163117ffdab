//! # Periodic Statistics Sender
//!
//! Publishes a snapshot of every tracked view counter on a fixed interval.
//! Messages carry a broker-side expiration of three send intervals: a
//! snapshot that has been superseded twice over is stale and should be
//! dropped by the broker instead of delivered.

use crate::config::StatisticsConfig;
use crate::constants::routing;
use crate::messaging::{MessageChannel, MessagingResult, OutboundMessage};
use crate::statistics::counter::StatisticsCounter;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodically publishes aggregated view statistics
pub struct PeriodicStatisticsSender {
    channel: Arc<dyn MessageChannel>,
    counter: Arc<StatisticsCounter>,
    config: StatisticsConfig,
}

impl PeriodicStatisticsSender {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        counter: Arc<StatisticsCounter>,
        config: StatisticsConfig,
    ) -> Self {
        Self {
            channel,
            counter,
            config,
        }
    }

    /// Publish the current snapshot, one message per tracked advertisement.
    ///
    /// An empty counter publishes nothing. Individual publish failures abort
    /// the batch; the next tick retries with a fresh snapshot.
    pub async fn publish_snapshot(&self) -> MessagingResult<()> {
        for stats in self.counter.snapshot() {
            let message = OutboundMessage::json(routing::PERIODICAL_STATISTICS_QUEUE, &stats)?
                .with_expiration(self.config.message_expiration());
            self.channel.publish(message).await?;

            debug!(
                advertisement_id = stats.advertisement_id,
                views = stats.views,
                "published periodic statistics"
            );
        }
        Ok(())
    }

    /// Start the send loop on its own task.
    ///
    /// The loop runs until the handle is aborted. Publish failures are
    /// logged and do not stop the loop; the broker being down for a few
    /// ticks only loses snapshots that would have expired anyway.
    pub fn start(self) -> JoinHandle<()> {
        info!(
            interval_seconds = self.config.send_interval_seconds,
            queue = routing::PERIODICAL_STATISTICS_QUEUE,
            "starting periodic statistics sender"
        );

        tokio::spawn(async move {
            if let Err(e) = self
                .channel
                .ensure_queue(routing::PERIODICAL_STATISTICS_QUEUE)
                .await
            {
                warn!(error = %e, "could not declare periodic statistics queue at startup");
            }

            let mut interval = tokio::time::interval(self.config.send_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so the first
            // snapshot goes out one full interval after startup
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(e) = self.publish_snapshot().await {
                    warn!(error = %e, "periodic statistics publish failed");
                }
            }
        })
    }
}
