//! Core domain for discrip.
//!
//! This crate holds everything that does not touch the operating system:
//! the `makemkvcon` line-protocol decoder, the typed event model, the disc
//! summary aggregation, bus payload shapes, device control code tables, and
//! the port traits the runtime crate implements.
//!
//! # Structure
//!
//! - `events` - Event model, item attributes, and the line decoder
//! - `summary` - Disc/title/stream aggregation handed to persistence
//! - `drive` - Drive status and device control code resolution
//! - `bus` - Topic naming and progress/message payloads
//! - `source` - Device selectors understood by the ripping tool
//! - `identity` - Disc identity derived from filesystem probes
//! - `ports` - Trait seams for hardware, transport and storage

#![deny(unused_crate_dependencies)]

pub mod bus;
pub mod drive;
pub mod events;
pub mod identity;
pub mod ports;
pub mod source;
pub mod summary;

pub use bus::{DriveTopics, ProgressPayload, ProgressSlot};
pub use drive::{ControlCodes, DriveStatus};
pub use events::{CommandExecution, DecodeError, Event, InfoValue, ItemAttribute, decode};
pub use identity::{DiscIdentity, IdentityError};
pub use ports::{
    ControlError, DeviceControl, DiscStore, OutboundMessage, PublishError, PublishOptions, Qos,
    StoreError, Transport,
};
pub use source::Source;
pub use summary::{DiscSummary, StreamSummary, TitleSummary};
