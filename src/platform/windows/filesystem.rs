//! Windows filesystem operations

use crate::error::Result;
use crate::platform::search_path;
use crate::platform::traits::FilesystemOps;
use std::path::{Path, PathBuf};

const EXECUTABLE_EXTENSIONS: &[&str] = &[".exe", ".bat", ".cmd", ".com"];

pub struct WindowsFilesystem;

impl WindowsFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl FilesystemOps for WindowsFilesystem {
    fn is_executable(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => matches!(ext.to_lowercase().as_str(), "exe" | "bat" | "cmd" | "com"),
            None => false,
        }
    }

    fn find_command(&self, command: &str) -> Result<Option<PathBuf>> {
        if command.contains('\\') || command.contains('/') {
            let path = PathBuf::from(command);
            if self.is_executable(&path) {
                return Ok(Some(path));
            }
            let with_exe = PathBuf::from(format!("{}.exe", command));
            return Ok(self.is_executable(&with_exe).then_some(with_exe));
        }
        Ok(search_path(command, EXECUTABLE_EXTENSIONS, |p| {
            self.is_executable(p)
        }))
    }
}
