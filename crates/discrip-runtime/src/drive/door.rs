//! Scoped door lock.

use tracing::{debug, warn};

use super::{DriveController, DriveError};

/// Keeps the drive door locked until released or dropped.
///
/// Dropping the guard without [`release`](Self::release) (for example when
/// the owning task is cancelled) spawns a background unlock, so the latch
/// is not left engaged. The background unlock needs a running tokio
/// runtime; outside one it is skipped with a warning.
#[must_use = "the door unlocks as soon as the guard is dropped"]
pub struct DoorLockGuard {
    controller: Option<DriveController>,
}

impl DoorLockGuard {
    pub(super) const fn new(controller: DriveController) -> Self {
        Self {
            controller: Some(controller),
        }
    }

    /// Unlock the door now and report the outcome.
    pub async fn release(mut self) -> Result<(), DriveError> {
        match self.controller.take() {
            Some(controller) => controller.unlock_door().await,
            None => Ok(()),
        }
    }
}

impl Drop for DoorLockGuard {
    fn drop(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(device = %controller.device_path().display(), "Door guard dropped, unlocking in background");
                handle.spawn(async move {
                    if let Err(e) = controller.unlock_door().await {
                        warn!(error = %e, "Background door unlock failed");
                    }
                });
            }
            Err(_) => {
                warn!(device = %controller.device_path().display(), "No runtime to unlock door from guard drop");
            }
        }
    }
}
