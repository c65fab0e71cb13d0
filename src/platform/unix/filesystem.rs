//! Unix filesystem operations

use crate::error::Result;
use crate::platform::search_path;
use crate::platform::traits::FilesystemOps;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct UnixFilesystem;

impl UnixFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl FilesystemOps for UnixFilesystem {
    fn is_executable(&self, path: &Path) -> bool {
        if let Ok(metadata) = path.metadata() {
            if metadata.is_file() {
                let permissions = metadata.permissions();
                return (permissions.mode() & 0o111) != 0;
            }
        }
        false
    }

    fn find_command(&self, command: &str) -> Result<Option<PathBuf>> {
        if command.contains('/') {
            let path = PathBuf::from(command);
            return Ok(self.is_executable(&path).then_some(path));
        }
        Ok(search_path(command, &[], |p| self.is_executable(p)))
    }
}
