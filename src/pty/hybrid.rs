//! Terminal-attached backend
//!
//! The child runs in its own session with a fresh pseudo-terminal as its
//! controlling terminal and stdin. Anything it writes to the terminal
//! directly (password prompts, progress bars drawn on `/dev/tty`) is read
//! back from the master side and forwarded to the caller's stdout, while
//! its stdout and stderr stay on pipes so they can be captured.

use crate::error::{Error, Result};
use crate::pty::{Completion, ExecutionBackend, SpawnRequest};
#[cfg(not(unix))]
use crate::platform::Platform;

#[derive(Debug, Clone, Default)]
pub struct HybridTerminalBackend {
    _private: (),
}

impl HybridTerminalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(unix))]
impl ExecutionBackend for HybridTerminalBackend {
    fn name(&self) -> &'static str {
        "hybrid-pty"
    }

    fn run(&self, _request: SpawnRequest<'_>) -> Result<Completion> {
        Err(Error::TerminalUnsupported {
            platform: Platform::name().to_string(),
        })
    }
}

#[cfg(unix)]
impl ExecutionBackend for HybridTerminalBackend {
    fn name(&self) -> &'static str {
        "hybrid-pty"
    }

    fn run(&self, request: SpawnRequest<'_>) -> Result<Completion> {
        unix::run(request)
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::io;
    use std::os::fd::{AsRawFd, RawFd};
    use std::os::unix::process::CommandExt;
    use std::process::Stdio;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use nix::pty::{openpty, OpenptyResult};

    use super::*;
    use crate::pty::process::{terminate, wait_for_exit};
    use crate::pty::streams::{pump, CaptureBuffer, Tee, DEFAULT_CAPTURE_LIMIT};
    use crate::pty::termios::EchoGuard;
    use crate::pty::{join_thread, join_thread_within, spawn_thread};

    /// Poll intervals granted to the terminal reader to drain after exit
    const TTY_DRAIN_POLLS: u32 = 8;

    pub(super) fn run(request: SpawnRequest<'_>) -> Result<Completion> {
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

        let pty_error = |reason: String| Error::PtyCreationFailed {
            command: command.to_string(),
            reason,
        };

        let OpenptyResult { master, slave } =
            openpty(None, None).map_err(|e| pty_error(e.to_string()))?;
        set_cloexec(master.as_raw_fd()).map_err(|e| pty_error(e.to_string()))?;
        set_cloexec(slave.as_raw_fd()).map_err(|e| pty_error(e.to_string()))?;

        let master = File::from(master);
        let tty_reader = master.try_clone().map_err(|e| pty_error(e.to_string()))?;

        let mut cmd = invocation.to_command();
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::from(slave))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // SAFETY: only async-signal-safe calls between fork and exec
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(io::Error::from)?;
                if libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        // Keystrokes come back through the child's terminal, so the host
        // must stop echoing them itself.
        let echo = stdin.is_stdin().then(EchoGuard::disable);
        if echo.as_ref().is_some_and(EchoGuard::is_active) {
            trace!("Host terminal echo disabled for '{}'", command);
        }

        let spawned = cmd.spawn();
        // Releases our copy of the slave; the child holds the only one now
        drop(cmd);
        let mut child = spawned.map_err(|e| Error::CommandSpawnFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Spawned '{}' on a terminal (pid {})", command, child.id());

        let done = Arc::new(AtomicBool::new(false));
        let out_capture = CaptureBuffer::with_limit(DEFAULT_CAPTURE_LIMIT);
        let err_capture = CaptureBuffer::with_limit(DEFAULT_CAPTURE_LIMIT);
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let input = stdin.into_reader(poll_interval);

        let started = (|| -> Result<_> {
            if let Some(reader) = input {
                let tty_writer = master.try_clone()?;
                let done = done.clone();
                spawn_thread("krnr-tty-in", move || {
                    pump(reader, tty_writer, Some(&done), true, "tty-in");
                })?;
            }

            let tty_sink = stdout.clone();
            let tty_thread = spawn_thread("krnr-tty-out", move || {
                pump(tty_reader, tty_sink, None, false, "tty-out");
            })?;

            let mut pipes = Vec::new();
            if let Some(pipe) = child_stdout {
                let tee = Tee::new(out_capture.clone(), stdout);
                pipes.push(spawn_thread("krnr-stdout", move || {
                    pump(pipe, tee, None, false, "stdout");
                })?);
            }
            if let Some(pipe) = child_stderr {
                let tee = Tee::new(err_capture.clone(), stderr);
                pipes.push(spawn_thread("krnr-stderr", move || {
                    pump(pipe, tee, None, false, "stderr");
                })?);
            }
            Ok((tty_thread, pipes))
        })();

        let (tty_thread, pipe_threads) = match started {
            Ok(threads) => threads,
            Err(e) => {
                terminate(&mut child, true);
                return Err(e);
            }
        };

        // setsid made the child a group leader
        let waited = wait_for_exit(&mut child, cancel, poll_interval, command, true);
        done.store(true, Ordering::SeqCst);

        for handle in pipe_threads {
            join_thread(handle, "output");
        }
        join_thread_within(tty_thread, poll_interval * TTY_DRAIN_POLLS, "tty-out");
        drop(master);
        drop(echo);

        Ok(Completion {
            code: waited?,
            stdout: out_capture.contents(),
            stderr: err_capture.contents(),
        })
    }

    fn set_cloexec(fd: RawFd) -> io::Result<()> {
        // SAFETY: fcntl on a descriptor we own
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: as above
        if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
