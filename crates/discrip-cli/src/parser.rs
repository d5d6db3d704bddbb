//! Command-line parser.
//!
//! Every option can also come from the environment (or a `.env` file), so
//! the appliance runs with no arguments at all inside a container.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use discrip_core::bus::DEFAULT_TOPIC_ROOT;
use discrip_core::drive::CDROM_HEADER_PATH;
use discrip_runtime::publisher::DEFAULT_MQTT_PORT;

/// Automated optical disc scanning appliance.
///
/// Without a subcommand, runs the scan loop: eject, wait for a disc, scan
/// it with makemkvcon, publish progress, record the result, repeat.
#[derive(Parser, Debug)]
#[command(name = "discrip")]
#[command(about = "Scan optical discs with makemkvcon and publish progress over MQTT")]
#[command(version)]
pub struct Cli {
    /// Device node of the drive
    #[arg(long, env = "DRIVE_PATH", global = true)]
    pub drive_path: Option<PathBuf>,

    /// MQTT broker host name
    #[arg(long, env = "MQTT_HOSTNAME")]
    pub mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = DEFAULT_MQTT_PORT)]
    pub mqtt_port: u16,

    #[arg(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    /// Root of every published topic
    #[arg(long, env = "MQTT_TOPIC_ROOT", default_value = DEFAULT_TOPIC_ROOT)]
    pub topic_root: String,

    /// Appliance name used in topics and as the MQTT client id [default: host name]
    #[arg(long, env = "DISCRIP_NAME")]
    pub name: Option<String>,

    /// makemkvcon license key to register at startup
    #[arg(long, env = "MAKEMKV_KEY", hide_env_values = true)]
    pub makemkv_key: Option<String>,

    /// Directory receiving one JSON record per scanned disc
    #[arg(long, env = "DISCRIP_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// makemkvcon executable
    #[arg(long, env = "MAKEMKVCON", default_value = "makemkvcon", global = true)]
    pub makemkvcon: PathBuf,

    /// Close the tray automatically after ejecting
    #[arg(long)]
    pub autoclose: bool,

    /// Drive status polling period in milliseconds
    #[arg(long, default_value_t = 500, global = true)]
    pub polling_ms: u64,

    /// Kernel header providing CD-ROM control codes
    #[arg(long, default_value = CDROM_HEADER_PATH, global = true)]
    pub control_header: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the scan loop (the default)
    Run,
    /// Print the current drive status
    Status,
    /// Unlock the door and open the tray
    Eject,
    /// Close the tray
    Close,
    /// Scan the inserted disc once and print the summary as JSON
    Info,
    /// Print the disc id and label of the inserted disc
    Identify,
}

impl Cli {
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
