//! Tray, door and status control for one optical drive.
//!
//! Every control request runs on a blocking worker while the shared device
//! lock is held, so it never overlaps a running tool command. A busy drive
//! is retried indefinitely; any other device error is returned to the
//! caller.

#[cfg(unix)]
mod cdrom;
mod door;

#[cfg(unix)]
pub use cdrom::CdromDevice;
pub use door::DoorLockGuard;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use discrip_core::{ControlCodes, ControlError, DeviceControl, DriveStatus};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::lock::DeviceLock;

/// Delay between attempts while the drive reports `EBUSY`.
pub const BUSY_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Interval between status samples while waiting for a state change.
pub const DEFAULT_POLLING_PERIOD: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("control request {request:#x} on {device} failed: {source}")]
    Device {
        device: PathBuf,
        request: u64,
        #[source]
        source: ControlError,
    },

    #[error("control worker failed: {0}")]
    Join(#[from] JoinError),
}

/// Drive tunables.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub polling_period: Duration,
    pub busy_retry_delay: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            polling_period: DEFAULT_POLLING_PERIOD,
            busy_retry_delay: BUSY_RETRY_DELAY,
        }
    }
}

/// High-level operations on one drive.
///
/// Cheap to clone; clones share the device handle and lock.
#[derive(Clone)]
pub struct DriveController {
    control: Arc<dyn DeviceControl>,
    codes: ControlCodes,
    lock: DeviceLock,
    config: DriveConfig,
}

impl DriveController {
    pub fn new(
        control: Arc<dyn DeviceControl>,
        codes: ControlCodes,
        lock: DeviceLock,
        config: DriveConfig,
    ) -> Self {
        Self {
            control,
            codes,
            lock,
            config,
        }
    }

    pub fn device_path(&self) -> PathBuf {
        self.control.device_path().to_path_buf()
    }

    pub fn device_lock(&self) -> DeviceLock {
        self.lock.clone()
    }

    pub const fn codes(&self) -> &ControlCodes {
        &self.codes
    }

    /// Issue one control request under the device lock, retrying while busy.
    async fn run_control(&self, request: u64, arg: i64) -> Result<i32, DriveError> {
        let _device = self.lock.acquire().await;
        loop {
            let control = Arc::clone(&self.control);
            let result = tokio::task::spawn_blocking(move || control.control(request, arg)).await?;
            match result {
                Ok(value) => return Ok(value),
                Err(ControlError::Busy) => {
                    debug!(request, "Drive busy, retrying");
                    sleep(self.config.busy_retry_delay).await;
                }
                Err(source) => {
                    return Err(DriveError::Device {
                        device: self.device_path(),
                        request,
                        source,
                    });
                }
            }
        }
    }

    /// Sample the current drive status.
    pub async fn status(&self) -> Result<DriveStatus, DriveError> {
        let raw = self.run_control(self.codes.drive_status, 0).await?;
        Ok(self.codes.status_from_raw(raw).unwrap_or_else(|| {
            warn!(raw, "Unrecognised drive status, treating as no info");
            DriveStatus::NoInfo
        }))
    }

    /// Raw `CDROM_DISC_STATUS` result describing the loaded media (audio,
    /// data mode, mixed) or an error status when none is loaded.
    pub async fn disc_status(&self) -> Result<i32, DriveError> {
        self.run_control(self.codes.disc_status, 0).await
    }

    /// Unlock the door, then eject.
    pub async fn open_tray(&self) -> Result<(), DriveError> {
        self.unlock_door().await?;
        self.run_control(self.codes.eject, 0).await?;
        info!(device = %self.device_path().display(), "Tray opened");
        Ok(())
    }

    pub async fn close_tray(&self) -> Result<(), DriveError> {
        self.run_control(self.codes.close_tray, 0).await?;
        info!(device = %self.device_path().display(), "Tray closed");
        Ok(())
    }

    pub async fn set_door_lock(&self, locked: bool) -> Result<(), DriveError> {
        self.run_control(self.codes.lock_door, i64::from(locked)).await?;
        debug!(device = %self.device_path().display(), locked, "Door lock set");
        Ok(())
    }

    pub async fn lock_door(&self) -> Result<(), DriveError> {
        self.set_door_lock(true).await
    }

    pub async fn unlock_door(&self) -> Result<(), DriveError> {
        self.set_door_lock(false).await
    }

    /// Lock the door and return a guard that unlocks it again.
    ///
    /// Call [`DoorLockGuard::release`] to unlock and observe errors. A guard
    /// dropped without release schedules the unlock in the background.
    pub async fn locked_door(&self) -> Result<DoorLockGuard, DriveError> {
        self.lock_door().await?;
        Ok(DoorLockGuard::new(self.clone()))
    }

    /// Run `operation` with the door locked, unlocking afterwards.
    ///
    /// The door is unlocked whether the operation succeeds or returns an
    /// error. If this future is dropped mid-operation the guard's drop path
    /// unlocks it.
    pub async fn with_locked_door<F, T>(&self, operation: F) -> Result<T, DriveError>
    where
        F: Future<Output = T>,
    {
        let guard = self.locked_door().await?;
        let output = operation.await;
        guard.release().await?;
        Ok(output)
    }

    /// Whether the current status is one of `targets` (or, with `invert`,
    /// none of them).
    pub async fn is_in_state(&self, targets: &[DriveStatus], invert: bool) -> Result<bool, DriveError> {
        let status = self.status().await?;
        Ok(targets.contains(&status) != invert)
    }

    /// Poll until [`is_in_state`](Self::is_in_state) holds.
    pub async fn wait_for_state(&self, targets: &[DriveStatus], invert: bool) -> Result<(), DriveError> {
        while !self.is_in_state(targets, invert).await? {
            sleep(self.config.polling_period).await;
        }
        Ok(())
    }

    pub async fn wait_disc_ok(&self) -> Result<(), DriveError> {
        self.wait_for_state(&[DriveStatus::DiscOk], false).await
    }

    pub async fn wait_disc_not_ok(&self) -> Result<(), DriveError> {
        self.wait_for_state(&[DriveStatus::DiscOk], true).await
    }

    pub async fn wait_tray_opened(&self) -> Result<(), DriveError> {
        self.wait_for_state(&[DriveStatus::TrayOpen], false).await
    }

    pub async fn wait_tray_closed(&self) -> Result<(), DriveError> {
        self.wait_for_state(&[DriveStatus::TrayOpen], true).await
    }

    /// Wait for the drive to settle on a disc (or on having none).
    pub async fn wait_disc_ready(&self) -> Result<(), DriveError> {
        self.wait_for_state(&[DriveStatus::NoDisc, DriveStatus::DiscOk], false)
            .await
    }

    pub async fn wait_disc_not_ready(&self) -> Result<(), DriveError> {
        self.wait_for_state(&[DriveStatus::NoDisc, DriveStatus::DiscOk], true)
            .await
    }

    /// Wait for the user to open and then close the tray.
    pub async fn wait_tray_cycle(&self) -> Result<(), DriveError> {
        self.wait_tray_opened().await?;
        self.wait_tray_closed().await
    }

    pub async fn is_disc_ok(&self) -> Result<bool, DriveError> {
        self.is_in_state(&[DriveStatus::DiscOk], false).await
    }

    pub async fn is_tray_open(&self) -> Result<bool, DriveError> {
        self.is_in_state(&[DriveStatus::TrayOpen], false).await
    }

    pub async fn is_disc_ready(&self) -> Result<bool, DriveError> {
        self.is_in_state(&[DriveStatus::NoDisc, DriveStatus::DiscOk], false)
            .await
    }

    /// Eject, wait for the tray to open, optionally close it again, then
    /// wait until it is closed.
    pub async fn cycle(&self, autoclose: bool) -> Result<(), DriveError> {
        self.open_tray().await?;
        self.wait_tray_opened().await?;
        if autoclose {
            self.close_tray().await?;
        }
        self.wait_tray_closed().await
    }
}

impl std::fmt::Debug for DriveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveController")
            .field("device", &self.control.device_path())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
