//! `ioctl` access to a Linux CD-ROM device node.

#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use discrip_core::{ControlError, DeviceControl};
use nix::errno::Errno;
use nix::libc;

/// Talks to a drive through its device node.
///
/// The node is opened for each request with `O_EXCL | O_NONBLOCK`, so a
/// request fails with `EBUSY` while the disc is mounted or another process
/// holds the drive, and opening never waits for media.
#[derive(Debug, Clone)]
pub struct CdromDevice {
    path: PathBuf,
}

impl CdromDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<File, ControlError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_EXCL | libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| from_errno(e.raw_os_error().map_or(Errno::UnknownErrno, Errno::from_raw)))
    }
}

impl DeviceControl for CdromDevice {
    fn device_path(&self) -> &Path {
        &self.path
    }

    #[allow(clippy::cast_possible_truncation)]
    fn control(&self, request: u64, arg: i64) -> Result<i32, ControlError> {
        let device = self.open()?;
        // SAFETY: the descriptor is open for the duration of the call and
        // every CD-ROM request used here takes an integer argument.
        let result = unsafe { libc::ioctl(device.as_raw_fd(), request as _, arg as libc::c_long) };
        Errno::result(result).map_err(from_errno)
    }
}

fn from_errno(errno: Errno) -> ControlError {
    if errno == Errno::EBUSY {
        ControlError::Busy
    } else {
        ControlError::Os {
            errno: errno as i32,
            message: errno.desc().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_retryable_error() {
        assert_eq!(from_errno(Errno::EBUSY), ControlError::Busy);
        assert!(from_errno(Errno::EBUSY).is_busy());
    }

    #[test]
    fn test_other_errno_keeps_code() {
        let err = from_errno(Errno::EIO);
        assert_eq!(
            err,
            ControlError::Os {
                errno: Errno::EIO as i32,
                message: Errno::EIO.desc().to_string(),
            }
        );
    }

    #[test]
    fn test_missing_node_is_os_error() {
        let device = CdromDevice::new("/nonexistent/sr9");
        let err = device.control(0x5326, 0).unwrap_err();
        assert!(matches!(err, ControlError::Os { errno, .. } if errno == Errno::ENOENT as i32));
    }
}
