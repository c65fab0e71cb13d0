//! Plain pipe backend

use std::process::{ChildStderr, ChildStdout, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pty::process::{terminate, wait_for_exit};
use crate::pty::streams::{pump, CaptureBuffer, InputSource, OutputSink, Tee, DEFAULT_CAPTURE_LIMIT};
use crate::pty::{join_thread, spawn_thread, Completion, ExecutionBackend, SpawnRequest};

/// Runs the shell with stdin, stdout and stderr all on pipes.
///
/// Host stdin is inherited rather than copied so a file or pipe feeding the
/// host reaches the child unchanged. On Unix the child leads a new process
/// group so cancellation can kill everything it started.
#[derive(Debug, Clone)]
pub struct PlainPipeBackend {
    capture_limit: usize,
}

impl PlainPipeBackend {
    pub fn new() -> Self {
        Self {
            capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }

    /// Bytes of each stream kept for the completion record
    pub fn with_capture_limit(mut self, limit: usize) -> Self {
        self.capture_limit = limit;
        self
    }
}

impl Default for PlainPipeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionBackend for PlainPipeBackend {
    fn name(&self) -> &'static str {
        "pipe"
    }

    fn run(&self, request: SpawnRequest<'_>) -> Result<Completion> {
        let SpawnRequest {
            invocation,
            command,
            cwd,
            stdin,
            stdout,
            stderr,
            cancel,
            poll_interval,
        } = request;

        let mut cmd = invocation.to_command();
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let input = match stdin {
            InputSource::Empty => {
                cmd.stdin(Stdio::null());
                None
            }
            InputSource::Stdin => {
                cmd.stdin(Stdio::inherit());
                None
            }
            source => {
                cmd.stdin(Stdio::piped());
                source.into_reader(poll_interval)
            }
        };
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let group = cfg!(unix);

        let mut child = cmd.spawn().map_err(|e| Error::CommandSpawnFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Spawned '{}' on pipes (pid {})", command, child.id());

        let done = Arc::new(AtomicBool::new(false));
        let out_capture = CaptureBuffer::with_limit(self.capture_limit);
        let err_capture = CaptureBuffer::with_limit(self.capture_limit);

        let started = start_pumps(
            input,
            child.stdin.take(),
            child.stdout.take(),
            child.stderr.take(),
            done.clone(),
            Tee::new(out_capture.clone(), stdout),
            Tee::new(err_capture.clone(), stderr),
        );
        let output_threads = match started {
            Ok(threads) => threads,
            Err(e) => {
                terminate(&mut child, group);
                return Err(e);
            }
        };

        let waited = wait_for_exit(&mut child, cancel, poll_interval, command, group);
        done.store(true, Ordering::SeqCst);
        for (handle, label) in output_threads {
            join_thread(handle, label);
        }

        Ok(Completion {
            code: waited?,
            stdout: out_capture.contents(),
            stderr: err_capture.contents(),
        })
    }
}

type OutputThreads = Vec<(std::thread::JoinHandle<()>, &'static str)>;

fn start_pumps(
    input: Option<Box<dyn std::io::Read + Send>>,
    child_stdin: Option<std::process::ChildStdin>,
    child_stdout: Option<ChildStdout>,
    child_stderr: Option<ChildStderr>,
    done: Arc<AtomicBool>,
    stdout: Tee<CaptureBuffer, OutputSink>,
    stderr: Tee<CaptureBuffer, OutputSink>,
) -> Result<OutputThreads> {
    if let (Some(reader), Some(writer)) = (input, child_stdin) {
        // Detached: the source may block past the child's exit. Dropping
        // `writer` when the pump ends gives the child EOF.
        spawn_thread("krnr-stdin", move || {
            pump(reader, writer, Some(&done), true, "stdin");
        })?;
    }

    let mut threads = Vec::new();
    if let Some(pipe) = child_stdout {
        threads.push((
            spawn_thread("krnr-stdout", move || {
                pump(pipe, stdout, None, false, "stdout");
            })?,
            "stdout",
        ));
    }
    if let Some(pipe) = child_stderr {
        threads.push((
            spawn_thread("krnr-stderr", move || {
                pump(pipe, stderr, None, false, "stderr");
            })?,
            "stderr",
        ));
    }
    Ok(threads)
}
