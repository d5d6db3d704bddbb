//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use discrip_core::{ControlCodes, ControlError, DeviceControl, DriveStatus};
use discrip_runtime::RunnerConfig;

/// Runner config that executes `script` with `sh -c` instead of the real
/// tool. Command arguments arrive as `$1`, `$2`, ...
pub fn shell_tool(script: &str) -> RunnerConfig {
    RunnerConfig::default().with_program("sh", ["-c", script, "makemkvcon"])
}

/// Scripted in-memory drive.
///
/// Status samples are served from a queue; the last one repeats once the
/// queue runs dry. The first `busy` requests of any kind report busy.
pub struct FakeDrive {
    path: PathBuf,
    codes: ControlCodes,
    statuses: Mutex<VecDeque<DriveStatus>>,
    busy: AtomicU32,
    failing_request: Option<u64>,
    calls: Mutex<Vec<(u64, i64)>>,
}

impl FakeDrive {
    pub fn new(statuses: &[DriveStatus]) -> Self {
        Self {
            path: PathBuf::from("/dev/fake0"),
            codes: ControlCodes::default(),
            statuses: Mutex::new(statuses.iter().copied().collect()),
            busy: AtomicU32::new(0),
            failing_request: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn busy_for(self, attempts: u32) -> Self {
        self.busy.store(attempts, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn failing(mut self, request: u64) -> Self {
        self.failing_request = Some(request);
        self
    }

    /// Every request that reached the device, busy attempts included.
    pub fn calls(&self) -> Vec<(u64, i64)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, request: u64) -> usize {
        self.calls().iter().filter(|(r, _)| *r == request).count()
    }

    fn raw_status(&self, status: DriveStatus) -> i32 {
        match status {
            DriveStatus::NoInfo => self.codes.status_no_info,
            DriveStatus::NoDisc => self.codes.status_no_disc,
            DriveStatus::TrayOpen => self.codes.status_tray_open,
            DriveStatus::DriveNotReady => self.codes.status_drive_not_ready,
            DriveStatus::DiscOk => self.codes.status_disc_ok,
        }
    }
}

impl DeviceControl for FakeDrive {
    fn device_path(&self) -> &Path {
        &self.path
    }

    fn control(&self, request: u64, arg: i64) -> Result<i32, ControlError> {
        self.calls.lock().unwrap().push((request, arg));

        if self
            .busy
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ControlError::Busy);
        }
        if self.failing_request == Some(request) {
            return Err(ControlError::Os {
                errno: 5,
                message: "Input/output error".to_string(),
            });
        }
        if request == self.codes.drive_status {
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.pop_front().unwrap_or(DriveStatus::NoInfo)
            } else {
                statuses.front().copied().unwrap_or(DriveStatus::NoInfo)
            };
            return Ok(self.raw_status(status));
        }
        Ok(0)
    }
}
