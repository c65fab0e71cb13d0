//! Events produced by a streaming run

use serde_json::{json, Value};

use crate::error::Error;

/// Prefix of the line announcing each command before it runs
pub const ANNOUNCE_PREFIX: &str = "-> ";

/// One item on a run's event channel.
///
/// A run yields a `Command` before each command starts, any number of
/// output `Line`s, and at most one `Failed`, which is always the last event
/// before the channel closes.
#[derive(Debug)]
pub enum RunEvent {
    /// The `-> <command>` line announcing the next command
    Command(String),
    /// A sanitized output line
    Line(String),
    /// The run stopped because a command failed
    Failed(Error),
}

impl RunEvent {
    /// Announcement for `command`
    pub fn announcement(command: &str) -> Self {
        RunEvent::Command(format!("{}{}", ANNOUNCE_PREFIX, command))
    }

    /// Display text of announcements and output lines alike
    pub fn as_line(&self) -> Option<&str> {
        match self {
            RunEvent::Command(line) | RunEvent::Line(line) => Some(line),
            RunEvent::Failed(_) => None,
        }
    }

    /// The announced command text, without the prefix
    pub fn command(&self) -> Option<&str> {
        match self {
            RunEvent::Command(line) => Some(line.strip_prefix(ANNOUNCE_PREFIX).unwrap_or(line)),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            RunEvent::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_announcement(&self) -> bool {
        matches!(self, RunEvent::Command(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunEvent::Failed(_))
    }

    /// JSON form used by `krnr run --json`
    pub fn to_json(&self) -> Value {
        match self {
            RunEvent::Command(_) => json!({ "type": "command", "command": self.command() }),
            RunEvent::Line(line) => json!({ "type": "line", "text": line }),
            RunEvent::Failed(err) => json!({
                "type": "error",
                "message": err.to_string(),
                "exit_code": err.exit_code(),
                "cancelled": err.is_cancelled(),
            }),
        }
    }
}
