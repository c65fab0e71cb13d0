//! Shell resolution
//!
//! Maps an optional shell override to the program and arguments that run
//! one command line. This is a lookup only: the command text is passed
//! through as a single argument and never parsed.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use crate::models::ShellType;
use crate::platform::Platform;

/// Program plus arguments that run a single command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ShellInvocation {
    fn new(program: PathBuf, flag: &str, command: &str) -> Self {
        Self {
            program,
            args: vec![OsString::from(flag), OsString::from(command)],
        }
    }

    /// What kind of interpreter `program` is
    pub fn shell_type(&self) -> ShellType {
        ShellType::from_program(&self.program.to_string_lossy())
    }

    /// Program as a display string
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// A fresh `std::process::Command` for this invocation
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl std::fmt::Display for ShellInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// Choose the interpreter for `command`.
///
/// - `pwsh` runs `pwsh -Command <command>`
/// - `powershell` runs Windows PowerShell when it is on PATH (PowerShell
///   Core otherwise) on Windows, and `pwsh` everywhere else
/// - `cmd` runs `cmd /C <command>`
/// - any other override is run with `-c`
/// - no override (or a blank one) uses the platform default: `cmd /C` on
///   Windows, bash from a standard location on Unix, falling back to
///   `/bin/sh`
pub fn resolve_shell(command: &str, shell_override: Option<&str>) -> ShellInvocation {
    let requested = shell_override.map(str::trim).filter(|s| !s.is_empty());

    let Some(shell) = requested else {
        let (program, flag) = Platform::shell().default_shell();
        return ShellInvocation::new(program, flag, command);
    };

    let kind = ShellType::from_program(shell);
    let program = match kind {
        ShellType::PowerShell => Platform::shell().powershell(),
        _ => PathBuf::from(shell),
    };
    ShellInvocation::new(program, kind.command_flag(), command)
}
