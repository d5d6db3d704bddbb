//! Outbound message transport port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delivery guarantee requested for a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qos {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub qos: Qos,
    pub retain: bool,
}

impl PublishOptions {
    #[must_use]
    pub const fn retained(mut self) -> Self {
        self.retain = true;
        self
    }

    #[must_use]
    pub const fn with_qos(mut self, qos: Qos) -> Self {
        self.qos = qos;
        self
    }
}

/// A message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub options: PublishOptions,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, options: PublishOptions) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            options,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("not connected")]
    NotConnected,
}

/// A persistent connection to the message bus.
///
/// Owned by exactly one publisher worker; producers never see it.
#[async_trait]
pub trait Transport: Send {
    /// (Re-)establish the connection, discarding any previous session.
    async fn connect(&mut self) -> Result<(), PublishError>;

    /// Deliver one message over the current connection.
    async fn publish(&mut self, message: &OutboundMessage) -> Result<(), PublishError>;
}
