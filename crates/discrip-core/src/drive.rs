//! Drive status and Linux CD-ROM control codes.
//!
//! The ioctl request numbers and status values are read once from the
//! kernel header at startup. Whatever the header does not define falls back
//! to the values compiled in here. The resulting `ControlCodes` is passed
//! explicitly to each drive controller.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default location of the kernel CD-ROM header.
pub const CDROM_HEADER_PATH: &str = "/usr/include/linux/cdrom.h";

/// Point-in-time drive state reported by `CDROM_DRIVE_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStatus {
    NoInfo,
    NoDisc,
    TrayOpen,
    DriveNotReady,
    DiscOk,
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoInfo => "no info",
            Self::NoDisc => "no disc",
            Self::TrayOpen => "tray open",
            Self::DriveNotReady => "drive not ready",
            Self::DiscOk => "disc ok",
        };
        f.write_str(name)
    }
}

/// ioctl request numbers and status values for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCodes {
    pub eject: u64,
    pub close_tray: u64,
    pub drive_status: u64,
    pub disc_status: u64,
    pub lock_door: u64,
    pub status_no_info: i32,
    pub status_no_disc: i32,
    pub status_tray_open: i32,
    pub status_drive_not_ready: i32,
    pub status_disc_ok: i32,
}

impl Default for ControlCodes {
    /// Values from `linux/cdrom.h`.
    fn default() -> Self {
        Self {
            eject: 0x5309,
            close_tray: 0x5319,
            drive_status: 0x5326,
            disc_status: 0x5327,
            lock_door: 0x5329,
            status_no_info: 0,
            status_no_disc: 1,
            status_tray_open: 2,
            status_drive_not_ready: 3,
            status_disc_ok: 4,
        }
    }
}

static DEFINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#define\s+(?P<key>\w+)\s+(?:0x(?P<hex>[0-9a-fA-F]+)|0b(?P<bin>[01]+)|(?P<dec>\d+))\b")
        .expect("define pattern is valid")
});

impl ControlCodes {
    /// Resolve codes from the header at `path`, falling back to defaults.
    ///
    /// A missing or unreadable header is not an error; it only means the
    /// built-in table is used as is.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                debug!(path = %path.display(), "Loading control codes from header");
                Self::from_header(&contents)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Control code header unavailable, using built-in table");
                Self::default()
            }
        }
    }

    /// Resolve codes from the system header at its default location.
    pub fn from_system() -> Self {
        Self::load(Path::new(CDROM_HEADER_PATH))
    }

    /// Overlay every `#define` found in `contents` onto the default table.
    pub fn from_header(contents: &str) -> Self {
        let defines = parse_defines(contents);
        let mut codes = Self::default();

        let request = |name: &str, slot: &mut u64| {
            if let Some(value) = defines.get(name) {
                *slot = *value;
            }
        };
        request("CDROMEJECT", &mut codes.eject);
        request("CDROMCLOSETRAY", &mut codes.close_tray);
        request("CDROM_DRIVE_STATUS", &mut codes.drive_status);
        request("CDROM_DISC_STATUS", &mut codes.disc_status);
        request("CDROM_LOCKDOOR", &mut codes.lock_door);

        let status = |name: &str, slot: &mut i32| {
            if let Some(value) = defines.get(name).and_then(|v| i32::try_from(*v).ok()) {
                *slot = value;
            }
        };
        status("CDS_NO_INFO", &mut codes.status_no_info);
        status("CDS_NO_DISC", &mut codes.status_no_disc);
        status("CDS_TRAY_OPEN", &mut codes.status_tray_open);
        status("CDS_DRIVE_NOT_READY", &mut codes.status_drive_not_ready);
        status("CDS_DISC_OK", &mut codes.status_disc_ok);

        codes
    }

    /// Map a raw `CDROM_DRIVE_STATUS` result onto `DriveStatus`.
    pub fn status_from_raw(&self, raw: i32) -> Option<DriveStatus> {
        [
            (self.status_no_info, DriveStatus::NoInfo),
            (self.status_no_disc, DriveStatus::NoDisc),
            (self.status_tray_open, DriveStatus::TrayOpen),
            (self.status_drive_not_ready, DriveStatus::DriveNotReady),
            (self.status_disc_ok, DriveStatus::DiscOk),
        ]
        .into_iter()
        .find_map(|(value, status)| (value == raw).then_some(status))
    }
}

/// Collect numeric `#define NAME value` lines (hex, binary or decimal).
fn parse_defines(contents: &str) -> HashMap<String, u64> {
    contents
        .lines()
        .filter_map(|line| {
            let caps = DEFINE_PATTERN.captures(line.trim_start())?;
            let value = if let Some(hex) = caps.name("hex") {
                u64::from_str_radix(hex.as_str(), 16).ok()?
            } else if let Some(bin) = caps.name("bin") {
                u64::from_str_radix(bin.as_str(), 2).ok()?
            } else {
                caps.name("dec")?.as_str().parse().ok()?
            };
            Some((caps["key"].to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = r"
/* ioctl commands */
#define CDROMEJECT		0x5309 /* Ejects the cdrom media */
#define CDROMCLOSETRAY		0x5319	/* pendant of CDROMEJECT */
#define CDROM_DRIVE_STATUS	0x5326  /* Get tray position, etc. */
#define CDROM_LOCKDOOR		0x5329  /* lock or unlock door */

/* drive status possibilities returned by CDROM_DRIVE_STATUS ioctl */
#define CDS_NO_INFO		0	/* if not implemented */
#define CDS_NO_DISC		1
#define CDS_TRAY_OPEN		2
#define CDS_DRIVE_NOT_READY	3
#define CDS_DISC_OK		4
#define CDC_CLOSE_TRAY		0b1
";

    #[test]
    fn test_header_values_override_defaults() {
        let header = HEADER.replace("0x5309", "0x1234");
        let codes = ControlCodes::from_header(&header);
        assert_eq!(codes.eject, 0x1234);
        assert_eq!(codes.close_tray, 0x5319);
        assert_eq!(codes.status_disc_ok, 4);
    }

    #[test]
    fn test_missing_defines_keep_fallback() {
        let codes = ControlCodes::from_header(HEADER);
        assert_eq!(codes.disc_status, 0x5327);
        assert_eq!(codes, ControlCodes::default());
    }

    #[test]
    fn test_binary_and_decimal_defines() {
        let defines = parse_defines(HEADER);
        assert_eq!(defines.get("CDC_CLOSE_TRAY"), Some(&1));
        assert_eq!(defines.get("CDS_DRIVE_NOT_READY"), Some(&3));
        assert_eq!(defines.get("CDROMEJECT"), Some(&0x5309));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let codes = ControlCodes::load(Path::new("/nonexistent/cdrom.h"));
        assert_eq!(codes, ControlCodes::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#define CDROM_LOCKDOOR 0x7777").unwrap();
        let codes = ControlCodes::load(file.path());
        assert_eq!(codes.lock_door, 0x7777);
    }

    #[test]
    fn test_status_from_raw() {
        let codes = ControlCodes::default();
        assert_eq!(codes.status_from_raw(4), Some(DriveStatus::DiscOk));
        assert_eq!(codes.status_from_raw(2), Some(DriveStatus::TrayOpen));
        assert_eq!(codes.status_from_raw(42), None);
    }
}
