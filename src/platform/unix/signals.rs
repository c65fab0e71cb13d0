//! Unix signal operations

use crate::error::{Error, Result};
use crate::platform::traits::SignalOps;
use nix::sys::signal::{kill, killpg, Signal as NixSignal};
use nix::unistd::Pid;

pub struct UnixSignals;

impl UnixSignals {
    pub fn new() -> Self {
        Self
    }
}

impl SignalOps for UnixSignals {
    fn kill_group(&self, pid: u32) -> Result<()> {
        killpg(Pid::from_raw(pid as i32), NixSignal::SIGKILL).map_err(|e| {
            Error::SignalSendFailed {
                signal: "SIGKILL (group)".to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn kill(&self, pid: u32) -> Result<()> {
        kill(Pid::from_raw(pid as i32), NixSignal::SIGKILL).map_err(|e| Error::SignalSendFailed {
            signal: "SIGKILL".to_string(),
            reason: e.to_string(),
        })
    }
}
