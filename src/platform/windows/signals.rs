//! Windows signal operations
//!
//! Windows has no signals; termination goes through `taskkill`, which can
//! take down the whole process tree with `/T`.

use crate::error::{Error, Result};
use crate::platform::traits::SignalOps;
use std::process::{Command, Stdio};

pub struct WindowsSignals;

impl WindowsSignals {
    pub fn new() -> Self {
        Self
    }

    fn taskkill(&self, pid: u32, tree: bool) -> Result<()> {
        let mut cmd = Command::new("taskkill");
        cmd.arg("/F");
        if tree {
            cmd.arg("/T");
        }
        let status = cmd
            .arg("/PID")
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::SignalSendFailed {
                signal: "Terminate".to_string(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::SignalSendFailed {
                signal: "Terminate".to_string(),
                reason: format!("taskkill exited with {}", status),
            })
        }
    }
}

impl SignalOps for WindowsSignals {
    fn kill_group(&self, pid: u32) -> Result<()> {
        self.taskkill(pid, true)
    }

    fn kill(&self, pid: u32) -> Result<()> {
        self.taskkill(pid, false)
    }
}
