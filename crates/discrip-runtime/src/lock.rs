//! The per-device mutex shared by the command runner and drive controller.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Serializes every tool invocation and control request against one drive.
///
/// The guarded value is the next command number, so only a holder of the
/// lock can allocate one.
#[derive(Debug, Clone, Default)]
pub struct DeviceLock {
    inner: Arc<Mutex<u64>>,
}

impl DeviceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the device.
    pub async fn acquire(&self) -> MutexGuard<'_, u64> {
        self.inner.lock().await
    }

    /// Take the lock only if nobody holds it.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, u64>> {
        self.inner.try_lock().ok()
    }
}
