//! CLI error type and exit code mapping.

use discrip_core::{IdentityError, StoreError};
use discrip_runtime::{DriveError, RunnerError, SetupError};
use thiserror::Error;

use crate::ripper::RipperError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Drive control failure.
    #[error("Drive error: {0}")]
    Drive(String),

    /// makemkvcon or blkid could not be run.
    #[error("Process error: {0}")]
    Process(String),

    /// Output could not be written.
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Exit code following sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,  // EX_CONFIG
            Self::Drive(_) => 69,   // EX_UNAVAILABLE
            Self::Process(_) => 71, // EX_OSERR
            Self::Io(_) => 74,      // EX_IOERR
        }
    }
}

impl From<DriveError> for CliError {
    fn from(err: DriveError) -> Self {
        Self::Drive(err.to_string())
    }
}

impl From<RunnerError> for CliError {
    fn from(err: RunnerError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<SetupError> for CliError {
    fn from(err: SetupError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<IdentityError> for CliError {
    fn from(err: IdentityError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<RipperError> for CliError {
    fn from(err: RipperError) -> Self {
        match err {
            RipperError::Drive(e) => e.into(),
            RipperError::Runner(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discrip_core::ControlError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
        assert_eq!(CliError::Io("x".into()).exit_code(), 74);
    }

    #[test]
    fn test_drive_error_mapping() {
        let err: CliError = DriveError::Device {
            device: "/dev/sr0".into(),
            request: 0x5309,
            source: ControlError::Os {
                errno: 5,
                message: "Input/output error".into(),
            },
        }
        .into();
        assert_eq!(err.exit_code(), 69);
        assert!(err.to_string().contains("0x5309"));
    }
}
