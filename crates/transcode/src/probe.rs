use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run `<program> -version` and report whether it exits cleanly in time.
///
/// The child is killed and reaped when the timeout elapses, and killed on drop
/// if the returned future is cancelled.
#[tracing::instrument(level = "debug", skip_all, fields(program = %program.display()))]
pub(crate) async fn responds(program: &Path, timeout: Duration) -> bool {
    let spawned = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(error) => {
            tracing::debug!(%error, "Failed to spawn binary");
            return false;
        },
    };
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(%status, "Binary exited");
            status.success()
        },
        Ok(Err(error)) => {
            tracing::debug!(%error, "Failed to wait for binary");
            false
        },
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Binary did not respond in time; killing");
            if let Err(error) = child.kill().await {
                tracing::warn!(%error, "Failed to kill unresponsive binary");
            }
            false
        },
    }
}
