//! Device control port.
//!
//! One call maps to one `ioctl` on the drive node. Implementations are
//! blocking and must be safe to call from a blocking worker thread.

use std::path::Path;

use thiserror::Error;

/// Errors reported by a single control call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The drive is busy with another request; the call may be retried.
    #[error("device busy")]
    Busy,

    /// Any other OS-level failure.
    #[error("device control failed (errno {errno}): {message}")]
    Os { errno: i32, message: String },
}

impl ControlError {
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

/// Issue raw control requests against one physical device.
pub trait DeviceControl: Send + Sync + 'static {
    /// Path of the device node this control talks to.
    fn device_path(&self) -> &Path;

    /// Issue `request` with integer argument `arg`, returning the raw result.
    fn control(&self, request: u64, arg: i64) -> Result<i32, ControlError>;
}
