//! Outbound message publishing.
//!
//! Producers hand messages to an [`OutboundPublisher`] without ever waiting
//! on the network. A single [`PublisherWorker`] owns the transport and
//! delivers queued messages in order, reconnecting and retrying on failure.
//! A message that exhausts its retry budget is dropped so one bad stretch
//! of connectivity cannot stall everything queued behind it.

mod mqtt;

pub use mqtt::{DEFAULT_MQTT_PORT, MqttConfig, MqttTransport};

use std::time::Duration;

use discrip_core::{OutboundMessage, PublishError, PublishOptions, Transport};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Messages buffered ahead of the worker before new ones are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

pub const DEFAULT_RETRIES: u32 = 10;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Worker tunables.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Failures tolerated for one message before it is dropped.
    pub retries: u32,
    /// Pause after every failure before reconnecting.
    pub retry_delay: Duration,
    pub queue_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            queue_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

/// Totals reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Producer handle. Cloning it is cheap; the worker keeps running until
/// every clone is dropped and the queue is empty.
#[derive(Debug, Clone)]
pub struct OutboundPublisher {
    sender: mpsc::Sender<OutboundMessage>,
}

impl OutboundPublisher {
    pub fn new(config: PublisherConfig) -> (Self, PublisherWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        (Self { sender }, PublisherWorker { receiver, config })
    }

    /// Queue a message for delivery. Never blocks and never fails; a full
    /// or closed queue drops the message with a warning.
    pub fn enqueue(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>, options: PublishOptions) {
        match self.sender.try_send(OutboundMessage::new(topic, payload, options)) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!(topic = %message.topic, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(message)) => {
                warn!(topic = %message.topic, "Publisher worker stopped, dropping message");
            }
        }
    }
}

/// Delivery loop; run it on its own task.
#[derive(Debug)]
pub struct PublisherWorker {
    receiver: mpsc::Receiver<OutboundMessage>,
    config: PublisherConfig,
}

impl PublisherWorker {
    /// Deliver messages over `transport` until every producer is gone.
    ///
    /// Each failure, whether connecting or publishing, costs the in-flight
    /// message one retry. Every successful delivery and every drop restores
    /// the full budget for the next message.
    pub async fn run<T: Transport>(mut self, mut transport: T) -> PublisherStats {
        let mut stats = PublisherStats::default();
        let Some(mut current) = self.receiver.recv().await else {
            return stats;
        };
        let mut remaining = self.config.retries;

        loop {
            let failure = match self.deliver_from(&mut transport, &mut current, &mut remaining, &mut stats).await {
                Ok(()) => break,
                Err(e) => e,
            };

            remaining = remaining.saturating_sub(1);
            warn!(topic = %current.topic, error = %failure, remaining, "Message delivery failed");

            if remaining == 0 {
                warn!(topic = %current.topic, "Retry budget exhausted, dropping message");
                stats.dropped += 1;
                match self.receiver.recv().await {
                    Some(next) => current = next,
                    None => break,
                }
                remaining = self.config.retries;
            }
            sleep(self.config.retry_delay).await;
        }

        info!(delivered = stats.delivered, dropped = stats.dropped, "Publisher worker stopped");
        stats
    }

    /// Connect, then deliver `current` and everything after it. Returns `Ok`
    /// once the queue is closed and empty.
    async fn deliver_from<T: Transport>(
        &mut self,
        transport: &mut T,
        current: &mut OutboundMessage,
        remaining: &mut u32,
        stats: &mut PublisherStats,
    ) -> Result<(), PublishError> {
        transport.connect().await?;
        debug!("Publisher connected");

        loop {
            transport.publish(current).await?;
            stats.delivered += 1;
            *remaining = self.config.retries;

            match self.receiver.recv().await {
                Some(next) => *current = next,
                None => return Ok(()),
            }
        }
    }
}
