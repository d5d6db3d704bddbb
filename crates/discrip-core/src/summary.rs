//! Structured disc summary built from an `info` command's history.
//!
//! Info lines arrive in whatever order the tool emits them. Titles and
//! streams are collected by their numeric index and sorted on output, so the
//! summary never depends on arrival order.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::events::{Event, InfoValue, ItemAttribute};

pub type Attributes = BTreeMap<ItemAttribute, InfoValue>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleSummary {
    pub attributes: Attributes,
    /// Ordered by stream number.
    pub streams: Vec<StreamSummary>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscSummary {
    pub attributes: Attributes,
    /// Ordered by title number.
    pub titles: Vec<TitleSummary>,
}

#[derive(Default)]
struct TitleBuilder {
    attributes: Attributes,
    streams: BTreeMap<u32, Attributes>,
}

impl DiscSummary {
    /// Fold every info event of `history` into a summary. Later values for the
    /// same slot replace earlier ones; non-info events are ignored.
    pub fn from_history<'a>(history: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut disc = Attributes::new();
        let mut titles: BTreeMap<u32, TitleBuilder> = BTreeMap::new();

        for event in history {
            match event {
                Event::DiscInfo {
                    attribute, value, ..
                } => {
                    disc.insert(*attribute, value.clone());
                }
                Event::TitleInfo {
                    title_number,
                    attribute,
                    value,
                    ..
                } => {
                    titles
                        .entry(*title_number)
                        .or_default()
                        .attributes
                        .insert(*attribute, value.clone());
                }
                Event::StreamInfo {
                    title_number,
                    stream_number,
                    attribute,
                    value,
                    ..
                } => {
                    titles
                        .entry(*title_number)
                        .or_default()
                        .streams
                        .entry(*stream_number)
                        .or_default()
                        .insert(*attribute, value.clone());
                }
                Event::Start { .. }
                | Event::Stop { .. }
                | Event::Message { .. }
                | Event::ProgressCurrent { .. }
                | Event::ProgressTotal { .. }
                | Event::ProgressValue { .. }
                | Event::DriveScan { .. }
                | Event::TitleCount { .. }
                | Event::Unknown { .. } => {}
            }
        }

        Self {
            attributes: disc,
            titles: titles
                .into_values()
                .map(|title| TitleSummary {
                    attributes: title.attributes,
                    streams: title
                        .streams
                        .into_values()
                        .map(|attributes| StreamSummary { attributes })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn get(&self, attribute: ItemAttribute) -> Option<&InfoValue> {
        self.attributes.get(&attribute)
    }

    /// The persistence handoff mapping:
    /// `{attr: value, "Titles": [{attr: value, "Streams": [{attr: value}]}]}`.
    pub fn to_json(&self) -> Value {
        let mut root = attributes_to_map(&self.attributes);
        let titles = self
            .titles
            .iter()
            .map(|title| {
                let mut map = attributes_to_map(&title.attributes);
                let streams = title
                    .streams
                    .iter()
                    .map(|stream| Value::Object(attributes_to_map(&stream.attributes)))
                    .collect();
                map.insert("Streams".to_string(), Value::Array(streams));
                Value::Object(map)
            })
            .collect();
        root.insert("Titles".to_string(), Value::Array(titles));
        Value::Object(root)
    }
}

impl TitleSummary {
    pub fn get(&self, attribute: ItemAttribute) -> Option<&InfoValue> {
        self.attributes.get(&attribute)
    }
}

impl StreamSummary {
    pub fn get(&self, attribute: ItemAttribute) -> Option<&InfoValue> {
        self.attributes.get(&attribute)
    }
}

fn attributes_to_map(attributes: &Attributes) -> Map<String, Value> {
    attributes
        .iter()
        .map(|(attribute, value)| {
            let json = serde_json::to_value(value).unwrap_or(Value::Null);
            (attribute.as_str().to_string(), json)
        })
        .collect()
}
