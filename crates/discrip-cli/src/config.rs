//! Resolved runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use discrip_runtime::{DriveConfig, MqttConfig, PublisherConfig, RunnerConfig};

use crate::error::CliError;
use crate::parser::Cli;

/// Everything the drive and scan loop need, resolved from CLI and env.
#[derive(Debug, Clone)]
pub struct RipperConfig {
    pub drive_path: PathBuf,
    /// Appliance name; second topic segment and MQTT client id.
    pub name: String,
    pub topic_root: String,
    /// `None` when no broker is configured.
    pub mqtt: Option<MqttConfig>,
    pub makemkv_key: Option<String>,
    pub out_dir: PathBuf,
    pub autoclose: bool,
    pub control_header: PathBuf,
    pub runner: RunnerConfig,
    pub drive: DriveConfig,
    pub publisher: PublisherConfig,
}

impl RipperConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let drive_path = cli.drive_path.clone().ok_or_else(|| {
            CliError::Config("drive not specified: set DRIVE_PATH or pass --drive-path".to_string())
        })?;
        if cli.polling_ms == 0 {
            return Err(CliError::Config("polling period must be positive".to_string()));
        }

        let name = match &cli.name {
            Some(name) => name.clone(),
            None => host_name()?,
        };

        let mqtt = cli.mqtt_host.as_ref().map(|host| {
            MqttConfig::new(host.clone(), name.clone())
                .with_port(cli.mqtt_port)
                .with_credentials(cli.mqtt_username.clone(), cli.mqtt_password.clone())
        });

        let runner = RunnerConfig::default().with_program(
            cli.makemkvcon.clone(),
            discrip_runtime::runner::DEFAULT_ARGS,
        );

        Ok(Self {
            drive_path,
            name,
            topic_root: cli.topic_root.clone(),
            mqtt,
            makemkv_key: cli.makemkv_key.clone().filter(|key| !key.trim().is_empty()),
            out_dir: cli.out_dir.clone(),
            autoclose: cli.autoclose,
            control_header: cli.control_header.clone(),
            runner,
            drive: DriveConfig {
                polling_period: Duration::from_millis(cli.polling_ms),
                ..DriveConfig::default()
            },
            publisher: PublisherConfig::default(),
        })
    }
}

#[cfg(unix)]
fn host_name() -> Result<String, CliError> {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .map_err(|e| CliError::Config(format!("cannot determine host name: {e}")))
}

#[cfg(not(unix))]
fn host_name() -> Result<String, CliError> {
    Err(CliError::Config("no appliance name: pass --name".to_string()))
}
