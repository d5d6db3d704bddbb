//! Teardown for `makemkvcon` children with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// How long a child gets to exit after SIGTERM before it is killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Stop a child process and reap it.
///
/// # Strategy
/// 1. Send SIGTERM and wait up to [`SHUTDOWN_GRACE`] for the tool to exit
/// 2. If still running, send SIGKILL
/// 3. Wait for reaping so no zombie is left behind
///
/// A child that already exited (or was already reaped by `try_wait`) is
/// simply waited on.
pub async fn shutdown_child(mut child: Child) -> io::Result<ExitStatus> {
    shutdown_with_grace(&mut child, SHUTDOWN_GRACE).await
}

pub(crate) async fn shutdown_with_grace(
    child: &mut Child,
    grace: Duration,
) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        let Some(pid) = child.id() else {
            return child.wait().await;
        };

        #[allow(clippy::cast_possible_wrap)]
        let target = Pid::from_raw(pid as i32);
        match signal::kill(target, Signal::SIGTERM) {
            Ok(()) => {}
            Err(nix::errno::Errno::ESRCH) => return child.wait().await,
            Err(e) => return Err(io::Error::other(e)),
        }

        if let Ok(result) = timeout(grace, child.wait()).await {
            return result;
        }
        tracing::debug!(pid, "Child ignored SIGTERM, escalating to SIGKILL");
    }

    #[cfg(not(unix))]
    let _ = grace;

    child.kill().await?;
    child.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;
    use tokio::time::sleep;

    #[tokio::test]
    #[cfg(unix)]
    async fn test_shutdown_responds_to_sigterm() {
        let child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("failed to spawn sleep");

        let status = shutdown_child(child).await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_shutdown_escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .stdout(Stdio::null())
            .spawn()
            .expect("failed to spawn sh");

        // Let the shell install its trap before signalling it.
        sleep(Duration::from_millis(200)).await;

        let status = shutdown_with_grace(&mut child, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_shutdown_handles_already_exited() {
        let child = Command::new("echo")
            .arg("test")
            .stdout(Stdio::null())
            .spawn()
            .expect("failed to spawn echo");

        sleep(Duration::from_millis(100)).await;

        let status = shutdown_child(child).await.unwrap();
        assert!(status.success());
    }
}
