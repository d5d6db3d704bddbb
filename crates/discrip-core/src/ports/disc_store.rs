//! Disc metadata persistence port.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::DiscIdentity;
use crate::summary::DiscSummary;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receives the structured summary of every scanned disc.
///
/// Storage layout and identity handling belong entirely to the
/// implementation.
#[async_trait]
pub trait DiscStore: Send + Sync {
    /// Whether a disc with this id has been recorded before.
    async fn contains(&self, disc_id: i64) -> Result<bool, StoreError>;

    /// Insert or update the record for `identity`.
    async fn record(&self, identity: &DiscIdentity, summary: &DiscSummary) -> Result<(), StoreError>;
}
