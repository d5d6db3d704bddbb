//! Disc identity derived from the filesystem on the inserted disc.
//!
//! UDF and ISO9660 volumes expose a UUID that is a 64-bit hex string.
//! The store keys discs by that value reinterpreted as a signed integer so it
//! fits a SQL `BIGINT`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("disc has no filesystem UUID")]
    MissingUuid,

    #[error("filesystem UUID is not a 64-bit hex value: {0:?}")]
    InvalidUuid(String),

    #[error("failed to probe disc: {0}")]
    Probe(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscIdentity {
    pub disc_id: i64,
    pub label: String,
}

impl DiscIdentity {
    /// Build an identity from the raw `blkid` UUID and LABEL values.
    pub fn from_probe(uuid: &str, label: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            disc_id: parse_disc_id(uuid)?,
            label: label.trim().to_string(),
        })
    }
}

/// Parse a hex UUID into a two's-complement `i64`.
#[allow(clippy::cast_possible_wrap)]
pub fn parse_disc_id(uuid: &str) -> Result<i64, IdentityError> {
    let hex: String = uuid.trim().chars().filter(|c| *c != '-').collect();
    if hex.is_empty() {
        return Err(IdentityError::MissingUuid);
    }
    let raw = u64::from_str_radix(&hex, 16).map_err(|_| IdentityError::InvalidUuid(uuid.to_string()))?;
    Ok(raw as i64)
}
