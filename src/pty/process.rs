//! Child process supervision shared by both execution backends

use std::process::Child;
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::platform::Platform;

/// Block until `child` exits, killing it if `cancel` fires first.
///
/// Returns the exit code (`None` when the child died from a signal). With
/// `group` set the whole process group led by the child is killed, which
/// takes grandchildren started by the shell down with it.
pub(crate) fn wait_for_exit(
    child: &mut Child,
    cancel: &CancellationToken,
    poll_interval: Duration,
    command: &str,
    group: bool,
) -> Result<Option<i32>> {
    loop {
        if let Some(status) = child.try_wait()? {
            debug!("'{}' exited with {}", command, status);
            return Ok(status.code());
        }

        if cancel.is_cancelled() {
            info!("Cancelling '{}' (pid {})", command, child.id());
            terminate(child, group);
            return Err(Error::Cancelled {
                command: command.to_string(),
            });
        }

        thread::sleep(poll_interval);
    }
}

/// Kill the child (and its group when asked) and reap it.
pub(crate) fn terminate(child: &mut Child, group: bool) {
    let signals = Platform::signals();
    let pid = child.id();

    let killed = if group {
        signals.kill_group(pid)
    } else {
        signals.kill(pid)
    };

    if let Err(e) = killed {
        debug!("Falling back to direct kill of pid {}: {}", pid, e);
        if let Err(e) = child.kill() {
            warn!("Failed to kill pid {}: {}", pid, e);
        }
    }

    if let Err(e) = child.wait() {
        warn!("Failed to reap pid {}: {}", pid, e);
    }
}
