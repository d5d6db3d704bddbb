//! Disc identity probing through `blkid`.

use std::path::Path;
use std::process::Stdio;

use discrip_core::{DiscIdentity, IdentityError};
use tokio::process::Command;
use tracing::debug;

const BLKID: &str = "blkid";

/// Read the filesystem UUID and label of the disc in `device`.
pub async fn probe_disc_identity(device: &Path) -> Result<DiscIdentity, IdentityError> {
    probe_with(BLKID, device).await
}

pub(crate) async fn probe_with(program: &str, device: &Path) -> Result<DiscIdentity, IdentityError> {
    let uuid = probe_tag(program, device, "UUID").await?;
    let label = probe_tag(program, device, "LABEL").await?;
    let identity = DiscIdentity::from_probe(&uuid, &label)?;
    debug!(device = %device.display(), disc_id = identity.disc_id, label = %identity.label, "Probed disc identity");
    Ok(identity)
}

/// `blkid -s <tag> -o value <device>`. A tag the filesystem does not carry
/// makes blkid print nothing and exit non-zero; that is an empty value here.
async fn probe_tag(program: &str, device: &Path, tag: &str) -> Result<String, IdentityError> {
    let output = Command::new(program)
        .args(["-s", tag, "-o", "value"])
        .arg(device)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| IdentityError::Probe(format!("{program}: {e}")))?;

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
