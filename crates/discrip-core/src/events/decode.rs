//! Line decoder for the robot-mode protocol.
//!
//! `decode` is pure: one line in, at most one event out. A malformed line is
//! reported as a `DecodeError` so the caller can log it and move on to the next
//! line; it never aborts a running command.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::attribute::{ItemAttribute, ValueKind};
use super::{Event, InfoValue};

/// Errors produced while decoding a single protocol line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{tag}: missing field '{field}'")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },

    #[error("{tag}: field '{field}' is not a valid integer: {value:?}")]
    InvalidInteger {
        tag: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{tag}: unknown item attribute id {id}")]
    UnknownAttribute { tag: &'static str, id: u32 },

    #[error("invalid duration {0:?} (expected H:MM:SS.fff)")]
    InvalidDuration(String),

    #[error("PRGV: progress limit is zero")]
    ZeroLimit,

    #[error("PRGV: progress {current}/{total} exceeds limit {limit}")]
    ProgressOutOfRange { current: u64, total: u64, limit: u64 },
}

/// Decode one line of tool output.
///
/// Returns `Ok(None)` for blank lines, `Event::Unknown` for lines whose tag is
/// not part of the protocol, and an error for recognised tags whose fields do
/// not match the grammar.
pub fn decode(line: &str) -> Result<Option<Event>, DecodeError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some((tag, rest)) = line.split_once(':') else {
        return Ok(Some(Event::Unknown {
            raw_fields: split_fields(line),
        }));
    };

    let event = match tag.trim().to_ascii_uppercase().as_str() {
        "MSG" => decode_message(Fields::new("MSG", rest))?,
        "PRGC" => {
            let fields = Fields::new("PRGC", rest);
            Event::ProgressCurrent {
                code: fields.parse(0, "code")?,
                operation_id: fields.parse(1, "id")?,
                name: fields.text(2, "name")?.to_string(),
            }
        }
        "PRGT" => {
            let fields = Fields::new("PRGT", rest);
            Event::ProgressTotal {
                code: fields.parse(0, "code")?,
                operation_id: fields.parse(1, "id")?,
                name: fields.text(2, "name")?.to_string(),
            }
        }
        "PRGV" => decode_progress_value(&Fields::new("PRGV", rest))?,
        "DRV" => {
            let fields = Fields::new("DRV", rest);
            Event::DriveScan {
                index: fields.parse(0, "index")?,
                visible: fields.parse(1, "visible")?,
                enabled: fields.parse(2, "enabled")?,
                flags: fields.parse(3, "flags")?,
                drive_name: fields.text(4, "drive_name")?.to_string(),
                disc_name: fields.text(5, "disc_name")?.to_string(),
                extra: fields.rest(6, "extra")?,
            }
        }
        "TCOUT" => Event::TitleCount {
            count: Fields::new("TCOUT", rest).parse(0, "count")?,
        },
        "CINFO" => {
            let fields = Fields::new("CINFO", rest);
            let (attribute, code, value) = decode_info(&fields, 0)?;
            Event::DiscInfo {
                attribute,
                code,
                value,
            }
        }
        "TINFO" => {
            let fields = Fields::new("TINFO", rest);
            let title_number = fields.parse(0, "title")?;
            let (attribute, code, value) = decode_info(&fields, 1)?;
            Event::TitleInfo {
                title_number,
                attribute,
                code,
                value,
            }
        }
        "SINFO" => {
            let fields = Fields::new("SINFO", rest);
            let title_number = fields.parse(0, "title")?;
            let stream_number = fields.parse(1, "stream")?;
            let (attribute, code, value) = decode_info(&fields, 2)?;
            Event::StreamInfo {
                title_number,
                stream_number,
                attribute,
                code,
                value,
            }
        }
        _ => Event::Unknown {
            raw_fields: split_fields(rest),
        },
    };

    Ok(Some(event))
}

fn decode_message(fields: Fields) -> Result<Event, DecodeError> {
    Ok(Event::Message {
        code: fields.parse(0, "code")?,
        flags: fields.parse(1, "flags")?,
        count: fields.parse(2, "count")?,
        text: fields.text(3, "message")?.to_string(),
        format_code: fields.text(4, "format")?.to_string(),
        parameters: fields.values.into_iter().skip(5).collect(),
    })
}

#[allow(clippy::cast_precision_loss)]
fn decode_progress_value(fields: &Fields) -> Result<Event, DecodeError> {
    let current: u64 = fields.parse(0, "current")?;
    let total: u64 = fields.parse(1, "total")?;
    let limit: u64 = fields.parse(2, "max")?;

    if limit == 0 {
        return Err(DecodeError::ZeroLimit);
    }
    if current > limit || total > limit {
        return Err(DecodeError::ProgressOutOfRange {
            current,
            total,
            limit,
        });
    }

    Ok(Event::ProgressValue {
        current,
        total,
        limit,
        current_fraction: current as f64 / limit as f64,
        total_fraction: total as f64 / limit as f64,
    })
}

/// Decode the `id,code,value...` tail shared by all info lines.
fn decode_info(
    fields: &Fields,
    offset: usize,
) -> Result<(ItemAttribute, i64, InfoValue), DecodeError> {
    let id: u32 = fields.parse(offset, "id")?;
    let attribute = ItemAttribute::from_id(id).ok_or(DecodeError::UnknownAttribute {
        tag: fields.tag,
        id,
    })?;
    let code = fields.parse(offset + 1, "code")?;
    let raw = fields.rest(offset + 2, "value")?;

    let value = match attribute.value_kind() {
        ValueKind::Integer => InfoValue::Integer(parse_field(fields.tag, "value", &raw)?),
        ValueKind::Duration => InfoValue::Duration(parse_duration(&raw)?),
        ValueKind::Text => InfoValue::Text(raw),
    };

    Ok((attribute, code, value))
}

/// Parse `H:MM:SS` with an optional fractional seconds part.
fn parse_duration(raw: &str) -> Result<Duration, DecodeError> {
    let invalid = || DecodeError::InvalidDuration(raw.to_string());

    let mut parts = raw.trim().split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hours: u64 = hours.parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .ok_or_else(invalid)?;
    let fraction = Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?;

    Duration::from_secs(whole).checked_add(fraction).ok_or_else(invalid)
}

fn parse_field<T: FromStr>(tag: &'static str, field: &'static str, raw: &str) -> Result<T, DecodeError> {
    raw.trim()
        .parse()
        .map_err(|_| DecodeError::InvalidInteger {
            tag,
            field,
            value: raw.to_string(),
        })
}

/// Unquoted fields of one line, with the tag kept for error reporting.
struct Fields {
    tag: &'static str,
    values: Vec<String>,
}

impl Fields {
    fn new(tag: &'static str, raw: &str) -> Self {
        Self {
            tag,
            values: split_fields(raw),
        }
    }

    fn text(&self, index: usize, field: &'static str) -> Result<&str, DecodeError> {
        self.values
            .get(index)
            .map(String::as_str)
            .ok_or(DecodeError::MissingField {
                tag: self.tag,
                field,
            })
    }

    fn parse<T: FromStr>(&self, index: usize, field: &'static str) -> Result<T, DecodeError> {
        parse_field(self.tag, field, self.text(index, field)?)
    }

    /// Every field from `index` on, rejoined with commas.
    fn rest(&self, index: usize, field: &'static str) -> Result<String, DecodeError> {
        if index >= self.values.len() {
            return Err(DecodeError::MissingField {
                tag: self.tag,
                field,
            });
        }
        Ok(self.values[index..].join(","))
    }
}

/// Split on commas that are not inside double quotes, then unquote each field.
fn split_fields(raw: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ',' if !quoted => {
                fields.push(unquote(&current).to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(unquote(&current).to_string());

    fields
}

fn unquote(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(field)
}
