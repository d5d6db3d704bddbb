//! Translation of scan events into bus updates.

use discrip_core::bus::message_payload;
use discrip_core::{Event, ProgressPayload};

/// Something to publish in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanUpdate {
    /// Serialized [`ProgressPayload`] for the progress topic.
    Progress(Vec<u8>),
    /// Serialized message text for the message topic.
    Message(Vec<u8>),
}

/// Tracks the current and total operation of one scan.
///
/// Operation changes only reset the tracked slot; progress is published on
/// value updates, so a dashboard never sees a name without its fraction.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    payload: ProgressPayload,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            payload: ProgressPayload::starting(),
        }
    }

    pub const fn payload(&self) -> &ProgressPayload {
        &self.payload
    }

    pub fn apply(&mut self, event: &Event) -> Option<ScanUpdate> {
        match event {
            Event::ProgressCurrent {
                code,
                operation_id,
                name,
            } => {
                self.payload.current.begin(name, *code, *operation_id);
                None
            }
            Event::ProgressTotal {
                code,
                operation_id,
                name,
            } => {
                self.payload.total.begin(name, *code, *operation_id);
                None
            }
            Event::ProgressValue {
                current_fraction,
                total_fraction,
                ..
            } => {
                self.payload.set_fractions(*current_fraction, *total_fraction);
                Some(ScanUpdate::Progress(self.payload.to_json()))
            }
            Event::Message { text, .. } => Some(ScanUpdate::Message(message_payload(text))),
            Event::Stop { .. } => Some(ScanUpdate::Progress(ProgressPayload::complete().to_json())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn progress_json(update: Option<ScanUpdate>) -> Value {
        match update {
            Some(ScanUpdate::Progress(bytes)) => serde_json::from_slice(&bytes).unwrap(),
            other => panic!("expected progress update, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_change_resets_slot_silently() {
        let mut tracker = ProgressTracker::new();
        let update = tracker.apply(&Event::ProgressCurrent {
            code: 5018,
            operation_id: 3,
            name: "Scanning CD-ROM devices".into(),
        });
        assert_eq!(update, None);
        assert_eq!(tracker.payload().current.name, "Scanning CD-ROM devices");
        assert_eq!(tracker.payload().current.id, 3);
        assert!(tracker.payload().current.progress.abs() < f64::EPSILON);
        assert_eq!(tracker.payload().total.name, "Starting");
    }

    #[test]
    fn test_value_publishes_both_fractions() {
        let mut tracker = ProgressTracker::new();
        tracker.apply(&Event::ProgressTotal {
            code: 5010,
            operation_id: 1,
            name: "Opening disc".into(),
        });
        let json = progress_json(tracker.apply(&Event::ProgressValue {
            current: 16384,
            total: 32768,
            limit: 65536,
            current_fraction: 0.25,
            total_fraction: 0.5,
        }));

        assert_eq!(json["current"]["progress"], 0.25);
        assert_eq!(json["total"]["progress"], 0.5);
        assert_eq!(json["total"]["name"], "Opening disc");
        assert_eq!(json["total"]["code"], 5010);
    }

    #[test]
    fn test_message_is_json_string() {
        let mut tracker = ProgressTracker::new();
        let update = tracker.apply(&Event::Message {
            code: 1005,
            flags: 0,
            count: 1,
            text: "MakeMKV started".into(),
            format_code: "%1 started".into(),
            parameters: vec!["MakeMKV".into()],
        });
        assert_eq!(update, Some(ScanUpdate::Message(b"\"MakeMKV started\"".to_vec())));
    }

    #[test]
    fn test_stop_publishes_complete() {
        let json = progress_json(ProgressTracker::new().apply(&Event::Stop { command_number: 4 }));
        assert_eq!(json["current"]["name"], "Complete");
        assert_eq!(json["total"]["code"], -2);
        assert_eq!(json["total"]["progress"], 1.0);
    }

    #[test]
    fn test_info_events_are_ignored() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.apply(&Event::TitleCount { count: 3 }), None);
        assert_eq!(tracker.apply(&Event::Start { command_number: 0 }), None);
    }
}
