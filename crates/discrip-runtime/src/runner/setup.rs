//! One-off tool invocations performed before the first scan.

use std::io;
use std::process::Stdio;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::RunnerConfig;

/// Selector the tool accepts without touching any hardware.
const NULL_DEVICE_SELECTOR: &str = "dev:/dev/null";

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} {action} exited with {status}")]
    Failed {
        program: String,
        action: &'static str,
        status: std::process::ExitStatus,
    },
}

/// Register a license key with the tool (`makemkvcon reg <key>`).
///
/// A rejected key is logged and otherwise ignored: the tool keeps working
/// in trial mode. Only a launch failure is an error.
pub async fn register_key(config: &RunnerConfig, key: &str) -> Result<(), SetupError> {
    let mut command = config.setup_command();
    command.args(["reg", key]);
    match run_to_completion(config, command, "reg").await {
        Ok(()) => info!("Registered makemkvcon license key"),
        Err(SetupError::Failed { status, .. }) => {
            warn!(%status, "makemkvcon rejected the license key, continuing without it");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Run an info command against `/dev/null` so the tool creates its data
/// directory and settings before the first real scan.
///
/// The tool reports failure for the null device, so only a launch failure
/// is an error here.
pub async fn prime(config: &RunnerConfig) -> Result<(), SetupError> {
    let mut command = config.setup_command();
    command.args(["info", NULL_DEVICE_SELECTOR]);
    match run_to_completion(config, command, "info").await {
        Ok(()) | Err(SetupError::Failed { .. }) => {
            debug!("makemkvcon primed");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn run_to_completion(
    config: &RunnerConfig,
    mut command: tokio::process::Command,
    action: &'static str,
) -> Result<(), SetupError> {
    let program = config.program_name();
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| SetupError::Launch {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(SetupError::Failed {
            program,
            action,
            status,
        })
    }
}
