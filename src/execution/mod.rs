//! Command execution
//!
//! [`Executor`] is the single entry point for running one command line:
//! it sanitizes and validates the text, short-circuits dry runs, resolves
//! the shell, and hands the invocation to whichever backend fits the input.

pub mod shell;

pub use crate::config::ExecutionConfig;
pub use shell::{resolve_shell, ShellInvocation};

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ansi::strip_ansi;
use crate::commands::prepare_command;
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::pty::{BackendSelector, Completion, InputSource, OutputSink, SpawnRequest};

/// Characters of captured output kept in a [`Error::CommandFailed`]
pub const FAILURE_OUTPUT_LIMIT: usize = 512;

/// Default interval between child/cancellation checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs one command line to completion.
///
/// Implementations block the calling thread. Output goes to the given sinks
/// as it is produced; `ctx` cancels a running child.
pub trait Runner: Send + Sync {
    fn execute(
        &self,
        ctx: &CancellationToken,
        command: &str,
        cwd: Option<&Path>,
        stdin: InputSource,
        stdout: OutputSink,
        stderr: OutputSink,
    ) -> Result<()>;
}

/// The standard [`Runner`]
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutionConfig,
    backends: BackendSelector,
    poll_interval: Duration,
}

impl Executor {
    /// Executor over the native backends
    pub fn new(config: ExecutionConfig) -> Self {
        Self::with_backends(config, BackendSelector::native())
    }

    /// Executor over caller-supplied backends
    pub fn with_backends(config: ExecutionConfig, backends: BackendSelector) -> Self {
        Self {
            config,
            backends,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    fn ensure_shell_exists(invocation: &ShellInvocation) -> Result<()> {
        let program = invocation.program_name();
        match Platform::filesystem().find_command(&program)? {
            Some(path) => {
                trace!("Using shell {}", path.display());
                Ok(())
            }
            None => Err(Error::ShellNotFound { shell: program }),
        }
    }
}

impl Runner for Executor {
    fn execute(
        &self,
        ctx: &CancellationToken,
        command: &str,
        cwd: Option<&Path>,
        stdin: InputSource,
        mut stdout: OutputSink,
        stderr: OutputSink,
    ) -> Result<()> {
        let command = prepare_command(command)?;

        if self.config.dry_run {
            if self.config.verbose {
                writeln!(stdout, "dry-run: {}", command)?;
            }
            return Ok(());
        }

        let invocation = resolve_shell(&command, self.config.shell.as_deref());
        Self::ensure_shell_exists(&invocation)?;

        let backend = self.backends.select(&stdin);
        debug!(
            "Executing '{}' via {} using {} backend",
            command,
            invocation.program_name(),
            backend.name()
        );

        let completion = backend.run(SpawnRequest {
            invocation: &invocation,
            command: &command,
            cwd,
            stdin,
            stdout,
            stderr,
            cancel: ctx,
            poll_interval: self.poll_interval,
        })?;

        if completion.success() {
            return Ok(());
        }

        Err(failure(&command, &invocation, completion))
    }
}

fn failure(command: &str, invocation: &ShellInvocation, completion: Completion) -> Error {
    Error::CommandFailed {
        command: command.to_string(),
        shell: invocation.program_name(),
        code: completion.code,
        stdout: summarize(&completion.stdout),
        stderr: summarize(&completion.stderr),
    }
}

/// Trimmed, colour-free tail of captured output, at most
/// [`FAILURE_OUTPUT_LIMIT`] characters.
fn summarize(captured: &[u8]) -> String {
    let text = strip_ansi(&String::from_utf8_lossy(captured));
    let text = text.trim();
    let count = text.chars().count();
    if count <= FAILURE_OUTPUT_LIMIT {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - FAILURE_OUTPUT_LIMIT).collect();
    format!("...{}", tail)
}
