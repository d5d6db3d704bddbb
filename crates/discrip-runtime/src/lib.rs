//! Runtime adapters for discrip.
//!
//! Everything here touches the operating system or the network: running
//! `makemkvcon`, issuing drive `ioctl`s, talking to the MQTT broker, probing
//! disc filesystems and writing disc records.
//!
//! # Structure
//!
//! - `lock` - The per-device mutex shared by runner and drive controller
//! - `runner` - Tool invocation, output decoding and the event queue
//! - `drive` - Tray, door and status control with state polling
//! - `publisher` - Buffered, retrying delivery to the message bus
//! - `identity` - Filesystem UUID/label probing via `blkid`
//! - `store` - JSON-file disc store
//! - `shutdown` - Child process teardown

pub mod drive;
pub mod identity;
pub mod lock;
pub mod publisher;
pub mod runner;
pub mod shutdown;
pub mod store;

#[cfg(unix)]
pub use drive::CdromDevice;
pub use drive::{DoorLockGuard, DriveConfig, DriveController, DriveError};
pub use identity::probe_disc_identity;
pub use lock::DeviceLock;
pub use publisher::{
    MqttConfig, MqttTransport, OutboundPublisher, PublisherConfig, PublisherStats, PublisherWorker,
};
pub use runner::{CommandRunner, RunnerConfig, RunnerError, SetupError};
pub use shutdown::shutdown_child;
pub use store::JsonDiscStore;
