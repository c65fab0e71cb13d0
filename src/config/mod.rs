//! Configuration management for krnr
//!
//! Settings that shape how commands are executed and streamed. Every field
//! has a default, so a partial (or absent) configuration file is fine.

pub mod loader;

pub use loader::{ConfigFormat, ConfigLoader, CONFIG_ENV_VAR};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration structure for krnr
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How individual commands are executed
    pub execution: ExecutionConfig,

    /// How runs of command sequences are streamed
    pub run: RunConfig,

    /// Log output of the binary
    pub logging: LoggingConfig,
}

/// Per-executor settings, fixed for the executor's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Validate and announce commands without running them
    pub dry_run: bool,

    /// Report what would run in dry-run mode
    pub verbose: bool,

    /// Shell override (`bash`, `pwsh`, `powershell`, a path, ...)
    pub shell: Option<String>,
}

/// Streaming run settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Deadline for a whole `krnr run`, in seconds
    pub timeout_secs: u64,

    /// Capacity of the event channel between producer and consumer
    pub event_buffer: usize,

    /// How often blocked readers and waiting backends check for
    /// cancellation, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            event_buffer: 256,
            poll_interval_ms: 25,
        }
    }
}

impl RunConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Logging settings for the binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Check the invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<()> {
        if self.run.timeout_secs == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "run.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.run.event_buffer == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "run.event_buffer".to_string(),
                reason: "Event buffer must be greater than 0".to_string(),
            });
        }

        if self.run.poll_interval_ms == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "run.poll_interval_ms".to_string(),
                reason: "Poll interval must be greater than 0".to_string(),
            });
        }

        if let Some(shell) = &self.execution.shell {
            if shell.trim().is_empty() {
                return Err(Error::ConfigValidationFailed {
                    field: "execution.shell".to_string(),
                    reason: "Shell override cannot be blank; omit it to use the default".to_string(),
                });
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "logging.level".to_string(),
                reason: "Log level cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
