//! Streaming runs of command sequences
//!
//! [`ExecutorAdapter`] runs a list of command lines one after another on a
//! background thread and reports progress as [`RunEvent`]s:
//!
//! - `-> <command>` before each command starts
//! - one event per sanitized output line, in the order the bytes arrived
//! - at most one terminal `Failed(Error::Exec(..))`, after which nothing
//!   else runs
//!
//! The channel closes when the run finishes, fails, or is cancelled.
//! Cancellation (through [`RunHandle::cancel`], by dropping the handle, or
//! through the parent token passed to [`StreamingRunner::run`]) kills the
//! running child and ends the run without a `Failed` event.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::events::RunEvent;
use crate::execution::Runner;
use crate::pty::{byte_pipe, InputSource, OutputSink, PipeWriter, SharedReader};
use crate::terminal::{stream_lines, StreamEnd};

/// Starts streaming runs
pub trait StreamingRunner: Send + Sync {
    /// Start running `commands` in order. Returns as soon as the run is
    /// under way; progress arrives on the handle.
    fn run(&self, ctx: &CancellationToken, commands: Vec<String>) -> Result<RunHandle>;
}

/// Where each command's standard input comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// The handle carries an [`InputWriter`] feeding every command in turn.
    /// Input sent after a command is announced goes to that command; input a
    /// command was given but never read is discarded with it.
    #[default]
    Piped,
    /// Commands read the host process's stdin, which lets a terminal-attached
    /// backend take over when that stdin is a TTY
    Inherit,
    /// Commands get no input at all
    Closed,
}

/// Tuning for [`ExecutorAdapter`]
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub input: InputMode,
    /// Capacity of the event channel
    pub event_buffer: usize,
    /// Cancellation latency bound for blocked reads
    pub poll_interval: Duration,
    /// Working directory for every command; the host's when `None`
    pub cwd: Option<PathBuf>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for AdapterOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            input: InputMode::default(),
            event_buffer: config.event_buffer,
            poll_interval: config.poll_interval(),
            cwd: None,
        }
    }
}

/// [`StreamingRunner`] over any [`Runner`]
#[derive(Clone)]
pub struct ExecutorAdapter {
    runner: Arc<dyn Runner>,
    options: AdapterOptions,
}

impl ExecutorAdapter {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        Self::with_options(runner, AdapterOptions::default())
    }

    pub fn with_options(runner: Arc<dyn Runner>, options: AdapterOptions) -> Self {
        Self { runner, options }
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }
}

impl StreamingRunner for ExecutorAdapter {
    fn run(&self, ctx: &CancellationToken, commands: Vec<String>) -> Result<RunHandle> {
        let id = Uuid::new_v4();
        let cancel = ctx.child_token();
        let (tx, rx) = mpsc::channel(self.options.event_buffer.max(1));

        let (input, shared_input) = match self.options.input {
            InputMode::Piped => {
                let (writer, reader) = byte_pipe(self.options.poll_interval);
                (Some(InputWriter { pipe: writer }), Some(SharedReader::new(reader)))
            }
            InputMode::Inherit | InputMode::Closed => (None, None),
        };

        let producer = Producer {
            id,
            runner: self.runner.clone(),
            commands,
            cancel: cancel.clone(),
            tx,
            input_mode: self.options.input,
            input: shared_input,
            poll_interval: self.options.poll_interval,
            cwd: self.options.cwd.clone(),
        };

        let short_id = id.simple().to_string();
        thread::Builder::new()
            .name(format!("krnr-run-{}", &short_id[..8]))
            .spawn(move || producer.drive())?;

        Ok(RunHandle {
            id,
            events: rx,
            cancel,
            input,
        })
    }
}

/// Forwards interactive input to whichever command is currently running
#[derive(Debug, Clone)]
pub struct InputWriter {
    pipe: PipeWriter,
}

impl InputWriter {
    /// Queue bytes for the running command's stdin, blocking while the
    /// input pipe is full
    pub fn send(&self, data: &[u8]) -> Result<()> {
        self.pipe.send_bytes(data).map_err(|_| Error::InputClosed)
    }

    /// Signal end-of-file to the running command and every later one
    pub fn close(&self) {
        self.pipe.close();
    }
}

/// Consumer side of a run.
///
/// Events can be read with [`next_event`](Self::next_event) from async code,
/// [`blocking_next_event`](Self::blocking_next_event) from a plain thread, or
/// by polling the handle as a [`Stream`]. Dropping the handle cancels the
/// run.
#[derive(Debug)]
pub struct RunHandle {
    id: Uuid,
    events: mpsc::Receiver<RunEvent>,
    cancel: CancellationToken,
    input: Option<InputWriter>,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The raw event receiver
    pub fn events(&mut self) -> &mut mpsc::Receiver<RunEvent> {
        &mut self.events
    }

    /// Next event, or `None` once the run has finished
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Blocking variant of [`next_event`](Self::next_event); must not be
    /// called from within an async runtime.
    pub fn blocking_next_event(&mut self) -> Option<RunEvent> {
        self.events.blocking_recv()
    }

    /// Stop the run. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that fires when this run is cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Input forwarder, present in [`InputMode::Piped`] runs
    pub fn input(&self) -> Option<&InputWriter> {
        self.input.as_ref()
    }

    /// Send interactive input to the running command
    pub fn send_input(&self, data: &[u8]) -> Result<()> {
        match &self.input {
            Some(input) => input.send(data),
            None => Err(Error::InputClosed),
        }
    }
}

impl Stream for RunHandle {
    type Item = RunEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RunEvent>> {
        self.get_mut().events.poll_recv(cx)
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// What the producer does after one command
enum Step {
    Continue,
    Stop,
}

/// Owns the sending half of the event channel for one run
struct Producer {
    id: Uuid,
    runner: Arc<dyn Runner>,
    commands: Vec<String>,
    cancel: CancellationToken,
    tx: mpsc::Sender<RunEvent>,
    input_mode: InputMode,
    input: Option<SharedReader>,
    poll_interval: Duration,
    cwd: Option<PathBuf>,
}

impl Producer {
    fn drive(self) {
        info!("Run {} started ({} commands)", self.id, self.commands.len());

        for command in &self.commands {
            if self.cancel.is_cancelled() {
                break;
            }
            // Take the input over before announcing, so bytes sent in reply
            // to the announcement reach this command
            let stdin = self.stdin_for_command();
            if !self.send(RunEvent::announcement(command)) {
                break;
            }

            match self.run_one(command, stdin) {
                Ok(Step::Continue) => {}
                Ok(Step::Stop) => break,
                Err(err) => {
                    warn!("Run {} failed: {}", self.id, err);
                    self.send(RunEvent::Failed(err));
                    break;
                }
            }
        }

        info!("Run {} finished", self.id);
        // Dropping self closes the channel
    }

    fn send(&self, event: RunEvent) -> bool {
        if self.tx.blocking_send(event).is_err() {
            debug!("Run {}: consumer went away", self.id);
            self.cancel.cancel();
            return false;
        }
        true
    }

    fn stdin_for_command(&self) -> InputSource {
        match (self.input_mode, &self.input) {
            (InputMode::Piped, Some(reader)) => InputSource::reader(reader.next_turn()),
            (InputMode::Inherit, _) => InputSource::Stdin,
            _ => InputSource::Empty,
        }
    }

    fn run_one(&self, command: &str, stdin: InputSource) -> Result<Step> {
        let (writer, mut reader) = byte_pipe(self.poll_interval);
        let sink = OutputSink::new(writer.clone());

        let runner = self.runner.clone();
        let cancel = self.cancel.clone();
        let cwd = self.cwd.clone();
        let owned = command.to_string();

        let executor = thread::Builder::new()
            .name("krnr-exec".to_string())
            .spawn(move || {
                let result =
                    runner.execute(&cancel, &owned, cwd.as_deref(), stdin, sink.clone(), sink);
                writer.close();
                result
            })
            .map_err(|e| Error::Exec(Box::new(Error::Io(e))))?;

        let end = stream_lines(&mut reader, &self.cancel, |line| {
            self.send(RunEvent::Line(line))
        });

        match end {
            Ok(StreamEnd::Eof) => {}
            Ok(StreamEnd::Cancelled) | Ok(StreamEnd::ConsumerGone) => {
                debug!("Run {}: stopping during '{}'", self.id, command);
                return Ok(Step::Stop);
            }
            Err(err) => {
                self.cancel.cancel();
                return Err(Error::Exec(Box::new(err)));
            }
        }

        match executor.join() {
            Ok(Ok(())) => Ok(Step::Continue),
            Ok(Err(err)) if err.is_cancelled() && self.cancel.is_cancelled() => Ok(Step::Stop),
            Ok(Err(err)) => Err(Error::Exec(Box::new(err))),
            Err(_) => Err(Error::Exec(Box::new(Error::Other(format!(
                "executor thread panicked while running '{}'",
                command
            ))))),
        }
    }
}
