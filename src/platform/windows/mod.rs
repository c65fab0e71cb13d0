//! Windows-specific platform implementations

mod filesystem;
mod shell;
mod signals;

pub use filesystem::WindowsFilesystem;
pub use shell::WindowsShell;
pub use signals::WindowsSignals;
