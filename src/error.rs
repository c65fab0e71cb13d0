//! Error types and Result aliases for krnr

use std::fmt;
use std::path::PathBuf;

use crate::commands::ValidationError;

/// Result type alias for krnr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for krnr
#[derive(Debug)]
pub enum Error {
    // === Validation errors ===
    /// Command text failed validation before any process was spawned
    InvalidCommand {
        command: String,
        reason: ValidationError,
    },

    // === Spawn errors ===
    /// Shell executable could not be located
    ShellNotFound {
        shell: String,
    },

    /// Failed to allocate a pseudo-terminal
    PtyCreationFailed {
        command: String,
        reason: String,
    },

    /// Failed to spawn the shell process
    CommandSpawnFailed {
        command: String,
        reason: String,
    },

    /// Hybrid terminal execution requested on a platform without PTYs
    TerminalUnsupported {
        platform: String,
    },

    // === Exit errors ===
    /// Child exited unsuccessfully
    CommandFailed {
        command: String,
        shell: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Execution was cancelled and the child was terminated
    Cancelled {
        command: String,
    },

    /// Failed to deliver a signal to a child or its process group
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    // === Stream errors ===
    /// Reading the child's output stream failed
    StreamRead {
        source: std::io::Error,
    },

    /// Interactive input was sent after the run stopped accepting it
    InputClosed,

    /// A command in a run failed; wraps the runner's error
    Exec(Box<Error>),

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound {
        path: PathBuf,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl Error {
    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled { .. } => true,
            Error::Exec(inner) => inner.is_cancelled(),
            _ => false,
        }
    }

    /// Exit code of the failed child, if the error came from one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { code, .. } => *code,
            Error::Exec(inner) => inner.exit_code(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Validation errors
            Error::InvalidCommand { reason, .. } => {
                write!(f, "invalid command: {}", reason)
            }

            // Spawn errors
            Error::ShellNotFound { shell } => {
                write!(f, "shell not found in PATH: {}", shell)
            }
            Error::PtyCreationFailed { command, reason } => {
                write!(f, "failed to create PTY for '{}': {}", command, reason)
            }
            Error::CommandSpawnFailed { command, reason } => {
                write!(f, "failed to spawn '{}': {}", command, reason)
            }
            Error::TerminalUnsupported { platform } => {
                write!(f, "PTY not supported on {}", platform)
            }

            // Exit errors
            Error::CommandFailed {
                command,
                shell,
                code,
                stdout,
                stderr,
            } => {
                match code {
                    Some(code) => write!(f, "command failed with exit code {}", code)?,
                    None => write!(f, "command terminated by signal")?,
                }
                write!(f, " (shell={} command={:?}", shell, command)?;
                if !stdout.is_empty() {
                    write!(f, " stdout={:?}", stdout)?;
                }
                if !stderr.is_empty() {
                    write!(f, " stderr={:?}", stderr)?;
                }
                write!(f, ")")
            }
            Error::Cancelled { command } => {
                write!(f, "command '{}' was cancelled", command)
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "failed to send {}: {}", signal, reason)
            }

            // Stream errors
            Error::StreamRead { source } => {
                write!(f, "failed to read command output: {}", source)
            }
            Error::InputClosed => {
                write!(f, "run is no longer accepting input")
            }
            Error::Exec(inner) => write!(f, "exec: {}", inner),

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound { path } => {
                write!(f, "configuration file '{}' not found", path.display())
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),

            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidCommand { reason, .. } => Some(reason),
            Error::StreamRead { source } => Some(source),
            Error::Exec(inner) => Some(inner.as_ref()),
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
