//! Typed events decoded from `makemkvcon` robot-mode output.
//!
//! Each protocol tag maps to exactly one `Event` variant. Consumers match on
//! the variant exhaustively instead of inspecting types at runtime.
//!
//! # Wire Format
//!
//! ```text
//! MSG:5010,0,0,"Failed to open disc","Failed to open disc"
//! PRGV:500,1000,65536
//! TINFO:0,9,0,"1:02:03"
//! ```

mod attribute;
mod decode;

use std::time::Duration;

use serde::{Serialize, Serializer};

pub use attribute::{ItemAttribute, ValueKind};
pub use decode::{DecodeError, decode};

/// Coerced value of an info line.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Integer(i64),
    Duration(Duration),
    Text(String),
}

impl InfoValue {
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl Serialize for InfoValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Duration(value) => serializer.serialize_f64(value.as_secs_f64()),
            Self::Text(value) => serializer.serialize_str(value),
        }
    }
}

/// One decoded unit of tool output.
///
/// `Start` and `Stop` never appear in tool output; the command runner emits
/// them around every invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Start {
        command_number: u64,
    },
    Stop {
        command_number: u64,
    },
    /// `MSG:code,flags,count,message,format,param0,param1,...`
    Message {
        code: i64,
        flags: i64,
        count: u32,
        text: String,
        format_code: String,
        parameters: Vec<String>,
    },
    /// `PRGC:code,id,name`
    ProgressCurrent {
        code: i64,
        operation_id: i64,
        name: String,
    },
    /// `PRGT:code,id,name`
    ProgressTotal {
        code: i64,
        operation_id: i64,
        name: String,
    },
    /// `PRGV:current,total,max`
    ProgressValue {
        current: u64,
        total: u64,
        limit: u64,
        current_fraction: f64,
        total_fraction: f64,
    },
    /// `DRV:index,visible,enabled,flags,drive name,disc name,device`
    DriveScan {
        index: u32,
        visible: i64,
        enabled: i64,
        flags: i64,
        drive_name: String,
        disc_name: String,
        extra: String,
    },
    /// `TCOUT:count`
    TitleCount {
        count: u32,
    },
    /// `CINFO:id,code,value`
    DiscInfo {
        attribute: ItemAttribute,
        code: i64,
        value: InfoValue,
    },
    /// `TINFO:title,id,code,value`
    TitleInfo {
        title_number: u32,
        attribute: ItemAttribute,
        code: i64,
        value: InfoValue,
    },
    /// `SINFO:title,stream,id,code,value`
    StreamInfo {
        title_number: u32,
        stream_number: u32,
        attribute: ItemAttribute,
        code: i64,
        value: InfoValue,
    },
    /// Any non-empty line with an unrecognised tag.
    Unknown {
        raw_fields: Vec<String>,
    },
}

impl Event {
    /// Command number carried by `Start`/`Stop`, `None` for everything else.
    pub const fn command_number(&self) -> Option<u64> {
        match self {
            Self::Start { command_number } | Self::Stop { command_number } => {
                Some(*command_number)
            }
            _ => None,
        }
    }

    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stop { .. })
    }
}

/// A finished tool invocation: its number plus everything it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandExecution {
    pub command_number: u64,
    /// Starts with exactly one `Start` and ends with exactly one `Stop`.
    pub history: Vec<Event>,
}

impl CommandExecution {
    /// Events strictly between the `Start` and `Stop` markers.
    pub fn body(&self) -> &[Event] {
        match self.history.len() {
            0..=2 => &[],
            len => &self.history[1..len - 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_value_serialization() {
        let json = serde_json::to_string(&InfoValue::Duration(Duration::from_millis(1500))).unwrap();
        assert_eq!(json, "1.5");
        let json = serde_json::to_string(&InfoValue::Integer(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&InfoValue::Text("Movie".to_string())).unwrap();
        assert_eq!(json, "\"Movie\"");
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = Event::Start { command_number: 3 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"start\""));
        assert!(json.contains("\"command_number\":3"));
    }

    #[test]
    fn test_execution_body() {
        let execution = CommandExecution {
            command_number: 0,
            history: vec![
                Event::Start { command_number: 0 },
                Event::TitleCount { count: 2 },
                Event::Stop { command_number: 0 },
            ],
        };
        assert_eq!(execution.body(), &[Event::TitleCount { count: 2 }]);
        assert_eq!(execution.history[0].command_number(), Some(0));
        assert!(execution.history[2].is_stop());
    }
}
