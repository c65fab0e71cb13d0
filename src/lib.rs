//! krnr - execution and output-streaming core of a personal command runner
//!
//! krnr saves named sequences of shell command lines and runs them again on
//! demand. This library is the part that actually runs them: it launches a
//! command line through a shell, optionally gives the child a real
//! controlling terminal so interactive prompts (such as `sudo` asking for a
//! password) work, and streams the output back line by line with SGR colour
//! kept and screen-control sequences stripped.
//!
//! ## Module Organization
//!
//! - [`commands`] - Command line sanitization and validation
//! - [`execution`] - Shell resolution and the [`Executor`] runner
//! - [`pty`] - Terminal-attached and plain-pipe process backends
//! - [`terminal`] - Escape-aware splitting of output into lines
//! - [`ansi`] - Output sanitizer and escape sequence grammar
//! - [`streaming`] - Sequential runs reported as events
//! - [`config`] - Configuration loading
//! - [`platform`] - Unix/Windows specifics (signals, PATH lookup, shells)
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use krnr::{ExecutionConfig, Executor, ExecutorAdapter, RunEvent, StreamingRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> krnr::Result<()> {
//! let adapter = ExecutorAdapter::new(Arc::new(Executor::new(ExecutionConfig::default())));
//! let mut run = adapter.run(&CancellationToken::new(), vec!["echo hello".into()])?;
//! while let Some(event) = run.blocking_next_event() {
//!     match event {
//!         RunEvent::Command(line) | RunEvent::Line(line) => println!("{}", line),
//!         RunEvent::Failed(err) => eprintln!("{}", err),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Child I/O is blocking and runs on plain threads: one producer per run,
//! one executor thread per command, and copy threads for each child stream.
//! Events reach async consumers through a bounded `tokio::sync::mpsc`
//! channel, and cancellation is a `tokio_util` `CancellationToken`.

#[macro_use]
extern crate tracing;

pub mod ansi;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod models;
pub mod platform;
pub mod pty;
pub mod streaming;
pub mod terminal;

pub use commands::{prepare_command, sanitize_command, validate_command, ValidationError};
pub use config::{Config, ConfigLoader, ExecutionConfig, LoggingConfig, RunConfig};
pub use error::{Error, Result};
pub use events::RunEvent;
pub use execution::{resolve_shell, Executor, Runner, ShellInvocation};
pub use models::ShellType;
pub use pty::{
    BackendSelector, Completion, ExecutionBackend, HybridTerminalBackend, InputSource,
    OutputSink, PlainPipeBackend, TerminalDetector,
};
pub use streaming::{
    AdapterOptions, ExecutorAdapter, InputMode, InputWriter, RunHandle, StreamingRunner,
};
pub use terminal::{stream_lines, EscapeAwareSplitter};

/// The current version of krnr from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");
