//! Message bus topics and payloads.
//!
//! Topics follow `<root>/<name>/<device-id>/{progress|message}`. Progress
//! payloads carry the current and total operation side by side so a
//! dashboard can render two bars from one message.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default topic root when none is configured.
pub const DEFAULT_TOPIC_ROOT: &str = "djmkv";

/// Topics belonging to one drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveTopics {
    base: String,
}

impl DriveTopics {
    /// Build the topic set for `device_path` under `root/name`.
    pub fn new(root: &str, name: &str, device_path: &Path) -> Self {
        let root = root.trim_matches('/');
        let device = device_identifier(device_path);
        Self {
            base: format!("{root}/{name}/{device}"),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn progress(&self) -> String {
        format!("{}/progress", self.base)
    }

    pub fn message(&self) -> String {
        format!("{}/message", self.base)
    }
}

/// `/dev/cdrom/sr0` becomes `dev_cdrom_sr0`.
pub fn device_identifier(device_path: &Path) -> String {
    device_path
        .to_string_lossy()
        .trim_matches('/')
        .replace('/', "_")
}

/// One side (current or total) of a progress payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSlot {
    pub progress: f64,
    pub name: String,
    pub code: i64,
    pub id: i64,
}

impl ProgressSlot {
    pub fn new(progress: f64, name: impl Into<String>, code: i64, id: i64) -> Self {
        Self {
            progress,
            name: name.into(),
            code,
            id,
        }
    }

    /// Replace the operation this slot tracks and reset its progress.
    pub fn begin(&mut self, name: &str, code: i64, id: i64) {
        self.progress = 0.0;
        self.name = name.to_string();
        self.code = code;
        self.id = id;
    }
}

/// Payload published on the `progress` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub current: ProgressSlot,
    pub total: ProgressSlot,
}

impl ProgressPayload {
    fn both(progress: f64, name: &str, code: i64) -> Self {
        Self {
            current: ProgressSlot::new(progress, name, code, code),
            total: ProgressSlot::new(progress, name, code, code),
        }
    }

    /// A scan has been started but no progress has been reported yet.
    pub fn starting() -> Self {
        Self::both(0.0, "Starting", -1)
    }

    /// The scan finished.
    pub fn complete() -> Self {
        Self::both(1.0, "Complete", -2)
    }

    /// The appliance is waiting for the user to insert a disc.
    pub fn awaiting_disc() -> Self {
        Self::both(-1.0, "Awaiting disc", -3)
    }

    pub fn set_fractions(&mut self, current: f64, total: f64) {
        self.current.progress = current;
        self.total.progress = total;
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Payload published on the `message` topic: the text as a JSON string.
pub fn message_payload(text: &str) -> Vec<u8> {
    serde_json::to_vec(text).unwrap_or_default()
}
