//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `nix`, `rumqttc` or filesystem types in any signature
//! - Hardware control is blocking; callers move it off the async runtime
//! - Transport and storage are async and owned by a single task each

pub mod device_control;
pub mod disc_store;
pub mod transport;

pub use device_control::{ControlError, DeviceControl};
pub use disc_store::{DiscStore, StoreError};
pub use transport::{OutboundMessage, PublishError, PublishOptions, Qos, Transport};
