//! Unix-specific platform implementations

mod filesystem;
mod shell;
mod signals;

pub use filesystem::UnixFilesystem;
pub use shell::UnixShell;
pub use signals::UnixSignals;
