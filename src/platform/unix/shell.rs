//! Unix shell operations

use crate::platform::traits::ShellOps;
use std::path::PathBuf;

/// Standard bash locations, checked in order
const BASH_PATHS: &[&str] = &["/bin/bash", "/usr/bin/bash", "/usr/local/bin/bash"];

pub struct UnixShell;

impl UnixShell {
    pub fn new() -> Self {
        Self
    }
}

impl ShellOps for UnixShell {
    fn default_shell(&self) -> (PathBuf, &'static str) {
        let program = BASH_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .unwrap_or_else(|| PathBuf::from("/bin/sh"));
        (program, "-c")
    }

    fn powershell(&self) -> PathBuf {
        // Only PowerShell Core exists off Windows
        PathBuf::from("pwsh")
    }
}
