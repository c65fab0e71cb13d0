//! Shell Type Definitions
//!
//! Classifies the interpreter a command is handed to, which decides the
//! flag that introduces a single command line.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Type of shell being used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    /// Bourne Again Shell
    #[default]
    Bash,
    /// POSIX sh
    Sh,
    /// Z Shell
    Zsh,
    /// Fish Shell
    Fish,
    /// Korn Shell
    Ksh,
    /// Dash
    Dash,
    /// PowerShell Core
    Pwsh,
    /// Windows PowerShell
    PowerShell,
    /// Command Prompt
    Cmd,
    /// Other/Unknown shell
    Other,
}

impl ShellType {
    /// Get a string representation of the shell type
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Sh => "sh",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
            ShellType::Ksh => "ksh",
            ShellType::Dash => "dash",
            ShellType::Pwsh => "pwsh",
            ShellType::PowerShell => "powershell",
            ShellType::Cmd => "cmd",
            ShellType::Other => "other",
        }
    }

    /// Get shell type from string (case-insensitive)
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bash" => ShellType::Bash,
            "sh" => ShellType::Sh,
            "zsh" => ShellType::Zsh,
            "fish" => ShellType::Fish,
            "ksh" => ShellType::Ksh,
            "dash" => ShellType::Dash,
            "pwsh" => ShellType::Pwsh,
            "powershell" => ShellType::PowerShell,
            "cmd" => ShellType::Cmd,
            _ => ShellType::Other,
        }
    }

    /// Classify a program name or path such as `/usr/bin/zsh` or `pwsh.exe`
    pub fn from_program(program: &str) -> Self {
        let stem = Path::new(program.trim())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Self::from_string(stem)
    }

    /// Flag that makes the interpreter run exactly one command line
    pub fn command_flag(&self) -> &'static str {
        match self {
            ShellType::Pwsh | ShellType::PowerShell => "-Command",
            ShellType::Cmd => "/C",
            _ => "-c",
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
