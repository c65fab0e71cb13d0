//! Core data models for krnr

pub mod shell_type;

pub use shell_type::ShellType;
