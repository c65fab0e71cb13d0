//! Windows shell operations

use crate::platform::traits::{FilesystemOps, ShellOps};
use crate::platform::windows::WindowsFilesystem;
use std::path::PathBuf;

pub struct WindowsShell;

impl WindowsShell {
    pub fn new() -> Self {
        Self
    }
}

impl ShellOps for WindowsShell {
    fn default_shell(&self) -> (PathBuf, &'static str) {
        (PathBuf::from("cmd"), "/C")
    }

    fn powershell(&self) -> PathBuf {
        // Windows PowerShell first, then PowerShell Core
        let fs = WindowsFilesystem::new();
        for candidate in ["powershell", "pwsh"] {
            if let Ok(Some(path)) = fs.find_command(candidate) {
                return path;
            }
        }
        PathBuf::from("powershell")
    }
}
