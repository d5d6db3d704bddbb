//! Composition root: wires drive control and the tool runner to one lock.

use std::sync::Arc;

use discrip_core::{ControlCodes, Source};
use discrip_runtime::{CdromDevice, CommandRunner, DeviceLock, DriveController};
use tracing::debug;

use crate::config::RipperConfig;

/// Drive-side components sharing one device lock.
pub struct DriveContext {
    pub controller: DriveController,
    pub runner: Arc<CommandRunner>,
}

pub fn bootstrap(config: &RipperConfig) -> DriveContext {
    let codes = ControlCodes::load(&config.control_header);
    debug!(?codes, "Resolved control codes");

    let lock = DeviceLock::new();
    let controller = DriveController::new(
        Arc::new(CdromDevice::new(&config.drive_path)),
        codes,
        lock.clone(),
        config.drive.clone(),
    );
    let runner = Arc::new(CommandRunner::with_lock(
        Source::Device(config.drive_path.clone()),
        config.runner.clone(),
        lock,
    ));

    DriveContext { controller, runner }
}
