//! Platform-specific operation traits
//!
//! These traits define the interface for platform-specific operations,
//! allowing for clean abstraction and easier testing.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Platform-specific signal operations
pub trait SignalOps: Send + Sync {
    /// Forcefully terminate a process and every process in its group
    fn kill_group(&self, pid: u32) -> Result<()>;

    /// Forcefully terminate a single process
    fn kill(&self, pid: u32) -> Result<()>;
}

/// Platform-specific filesystem operations
pub trait FilesystemOps: Send + Sync {
    /// Check if a file is executable
    fn is_executable(&self, path: &Path) -> bool;

    /// Find a command in PATH
    fn find_command(&self, command: &str) -> Result<Option<PathBuf>>;
}

/// Platform-specific shell operations
pub trait ShellOps: Send + Sync {
    /// Interpreter used when no shell override is given, with its
    /// run-one-command flag
    fn default_shell(&self) -> (PathBuf, &'static str);

    /// Executable that answers a request for "powershell"
    fn powershell(&self) -> PathBuf;
}
