//! Child process backends
//!
//! A command runs under one of two backends:
//!
//! - [`HybridTerminalBackend`]: the child gets a fresh pseudo-terminal as its
//!   controlling terminal and stdin, so password prompts that open the
//!   terminal directly work, while stdout and stderr stay on ordinary pipes
//!   that are both captured and forwarded.
//! - [`PlainPipeBackend`]: every stream is a pipe.
//!
//! [`BackendSelector`] picks the hybrid backend only when the input is the
//! host's own terminal.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::execution::ShellInvocation;

mod hybrid;
mod pipe;
pub(crate) mod process;
pub mod streams;
#[cfg(unix)]
pub mod termios;

pub use hybrid::HybridTerminalBackend;
pub use pipe::PlainPipeBackend;
pub use streams::{
    byte_pipe, pump, CaptureBuffer, InputSource, OutputSink, PipeReader, PipeWriter, PumpEnd,
    SharedReader, Tee,
};

/// Everything a backend needs to run one command
pub struct SpawnRequest<'a> {
    /// Interpreter and arguments, command line included
    pub invocation: &'a ShellInvocation,
    /// Command line as the user wrote it, for diagnostics
    pub command: &'a str,
    pub cwd: Option<&'a Path>,
    pub stdin: InputSource,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    pub cancel: &'a CancellationToken,
    /// How often the child and the cancel token are checked
    pub poll_interval: Duration,
}

/// Result of a child that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Exit code, `None` when the child was killed by a signal
    pub code: Option<i32>,
    /// Tail of everything the child wrote to stdout
    pub stdout: Vec<u8>,
    /// Tail of everything the child wrote to stderr
    pub stderr: Vec<u8>,
}

impl Completion {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A way of running one shell invocation to completion
pub trait ExecutionBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Spawn the child, stream its output, and block until it exits or the
    /// request's token is cancelled.
    fn run(&self, request: SpawnRequest<'_>) -> Result<Completion>;
}

/// Decides whether an input source is an interactive terminal
pub trait TerminalDetector: Send + Sync {
    fn is_terminal(&self, input: &InputSource) -> bool;
}

impl<F> TerminalDetector for F
where
    F: Fn(&InputSource) -> bool + Send + Sync,
{
    fn is_terminal(&self, input: &InputSource) -> bool {
        self(input)
    }
}

/// Reports a terminal when the input is the host's stdin and that stdin is
/// a TTY on a platform with pseudo-terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTerminalDetector;

impl TerminalDetector for HostTerminalDetector {
    fn is_terminal(&self, input: &InputSource) -> bool {
        cfg!(unix) && input.is_stdin() && std::io::stdin().is_terminal()
    }
}

/// Chooses between the terminal-attached and the plain backend
#[derive(Clone)]
pub struct BackendSelector {
    detector: Arc<dyn TerminalDetector>,
    terminal: Arc<dyn ExecutionBackend>,
    plain: Arc<dyn ExecutionBackend>,
}

impl BackendSelector {
    pub fn new(
        detector: Arc<dyn TerminalDetector>,
        terminal: Arc<dyn ExecutionBackend>,
        plain: Arc<dyn ExecutionBackend>,
    ) -> Self {
        Self {
            detector,
            terminal,
            plain,
        }
    }

    /// Real backends with host TTY detection
    pub fn native() -> Self {
        Self::new(
            Arc::new(HostTerminalDetector),
            Arc::new(HybridTerminalBackend::new()),
            Arc::new(PlainPipeBackend::new()),
        )
    }

    /// Replace the terminal detector
    pub fn with_detector(mut self, detector: Arc<dyn TerminalDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn select(&self, input: &InputSource) -> &dyn ExecutionBackend {
        if self.detector.is_terminal(input) {
            self.terminal.as_ref()
        } else {
            self.plain.as_ref()
        }
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelector")
            .field("terminal", &self.terminal.name())
            .field("plain", &self.plain.name())
            .finish()
    }
}

/// Start a named helper thread.
pub(crate) fn spawn_thread<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(f)?)
}

/// Join a helper thread, logging instead of propagating a panic.
pub(crate) fn join_thread(handle: JoinHandle<()>, label: &str) {
    if handle.join().is_err() {
        error!("{} thread panicked", label);
    }
}

/// Join a helper thread if it finishes within `limit`; otherwise leave it
/// detached.
pub(crate) fn join_thread_within(handle: JoinHandle<()>, limit: Duration, label: &str) {
    let deadline = Instant::now() + limit;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            debug!("{} thread still running after {:?}, detaching", label, limit);
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    join_thread(handle, label);
}
