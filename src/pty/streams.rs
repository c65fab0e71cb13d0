//! Byte streams between the runner, its child and the line splitter
//!
//! Blocking child I/O is pumped on plain threads. Output reaches the
//! streaming side through an in-process byte pipe whose reader wakes up
//! every poll interval, so readers can notice cancellation without the
//! writer having to go away first. The pipe holds a bounded number of
//! chunks, so a consumer that stops reading holds back the writer and,
//! through the OS pipe, the child.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zeroize::Zeroize;

/// Copy buffer size for every pump
pub const PUMP_BUFFER_SIZE: usize = 4096;

/// Chunks a [`byte_pipe`] holds before writers block
pub const PIPE_CAPACITY: usize = 32;

/// Default number of bytes of each stream kept for error reports
pub const DEFAULT_CAPTURE_LIMIT: usize = 64 * 1024;

/// Where a child's standard input comes from
pub enum InputSource {
    /// No input; the child sees EOF (or a null device)
    Empty,
    /// The host process's own standard input
    Stdin,
    /// Any other byte source, copied into the child
    Reader(Box<dyn Read + Send>),
}

impl InputSource {
    /// Wrap a reader
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        InputSource::Reader(Box::new(reader))
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, InputSource::Stdin)
    }

    /// Turn the source into something a pump thread can read from.
    ///
    /// Host stdin is read straight from the descriptor with a poll timeout so
    /// the pump can stop once the child is gone.
    pub fn into_reader(self, poll_interval: Duration) -> Option<Box<dyn Read + Send>> {
        match self {
            InputSource::Empty => None,
            #[cfg(unix)]
            InputSource::Stdin => Some(Box::new(PolledStdin::new(poll_interval))),
            #[cfg(not(unix))]
            InputSource::Stdin => {
                let _ = poll_interval;
                Some(Box::new(io::stdin()))
            }
            InputSource::Reader(reader) => Some(reader),
        }
    }
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Empty => f.write_str("Empty"),
            InputSource::Stdin => f.write_str("Stdin"),
            InputSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Shared, cloneable destination for child output.
///
/// stdout and stderr may be handed the same sink; writes are serialized by
/// an internal lock.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// The host process's stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// The host process's stderr
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Throw everything away
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    /// A sink that records everything written to it
    pub fn capture() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::unbounded();
        (Self::new(buffer.clone()), buffer)
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))?;
        inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))?;
        inner.flush()
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Growable byte buffer that keeps only its most recent `limit` bytes
#[derive(Clone, Debug)]
pub struct CaptureBuffer {
    data: Arc<Mutex<Vec<u8>>>,
    limit: usize,
}

impl CaptureBuffer {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(Vec::new())),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::with_limit(usize::MAX)
    }

    /// Copy of everything currently held
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Contents decoded lossily as UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| io::Error::other("capture buffer lock poisoned"))?;
        data.extend_from_slice(buf);
        if data.len() > self.limit {
            let excess = data.len() - self.limit;
            data.drain(..excess);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes every byte to two destinations
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Create an in-process byte pipe.
///
/// The reader returns [`io::ErrorKind::WouldBlock`] whenever no data arrives
/// within `poll_interval`, and end-of-file once the writer is closed (or
/// every writer clone is dropped) and all pending data has been read.
///
/// At most [`PIPE_CAPACITY`] chunks of up to [`PUMP_BUFFER_SIZE`] bytes are
/// queued; further writes block until the reader catches up or goes away.
pub fn byte_pipe(poll_interval: Duration) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::sync_channel(PIPE_CAPACITY);
    let closed = Arc::new(AtomicBool::new(false));
    let writer = PipeWriter {
        tx,
        closed: closed.clone(),
    };
    let reader = PipeReader {
        rx,
        pending: Vec::new(),
        offset: 0,
        closed,
        poll_interval,
    };
    (writer, reader)
}

/// Write end of a [`byte_pipe`]
#[derive(Clone, Debug)]
pub struct PipeWriter {
    tx: SyncSender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl PipeWriter {
    /// Queue bytes without needing a mutable handle, blocking while the
    /// pipe is full
    pub fn send_bytes(&self, data: &[u8]) -> io::Result<()> {
        if self.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        for piece in data.chunks(PUMP_BUFFER_SIZE) {
            self.tx
                .send(piece.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped"))?;
        }
        Ok(())
    }

    /// Signal end-of-file to the reader, even while other clones are alive
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read end of a [`byte_pipe`]
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
    closed: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl PipeReader {
    fn take_pending(&mut self, buf: &mut [u8]) -> usize {
        let available = &self.pending[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        n
    }

    fn refill(&mut self, chunk: Vec<u8>) {
        self.pending = chunk;
        self.offset = 0;
    }

    /// Give back the last `n` bytes returned by `read`
    fn unread(&mut self, n: usize) {
        self.offset -= n.min(self.offset);
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.offset < self.pending.len() {
                return Ok(self.take_pending(buf));
            }
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(chunk) => self.refill(chunk),
                Err(RecvTimeoutError::Timeout) => {
                    if !self.closed.load(Ordering::SeqCst) {
                        return Err(io::Error::new(
                            io::ErrorKind::WouldBlock,
                            "no data within poll interval",
                        ));
                    }
                    // Writes made before close() are already queued
                    match self.rx.try_recv() {
                        Ok(chunk) => self.refill(chunk),
                        Err(_) => return Ok(0),
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
    }
}

/// A [`PipeReader`] that several consumers take turns reading from.
///
/// Used to feed one interactive input stream into a sequence of children.
/// Each consumer gets its own turn from [`next_turn`](Self::next_turn); once
/// a later turn has been handed out, an earlier one reads end-of-file and
/// any bytes it was just given go back to the pipe for the new holder.
#[derive(Clone, Debug)]
pub struct SharedReader {
    inner: Arc<Mutex<PipeReader>>,
    current: Arc<AtomicU64>,
    turn: u64,
}

impl SharedReader {
    pub fn new(reader: PipeReader) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
            current: Arc::new(AtomicU64::new(0)),
            turn: 0,
        }
    }

    /// Hand the input to a new consumer, retiring every earlier handle
    pub fn next_turn(&self) -> SharedReader {
        let turn = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        SharedReader {
            inner: self.inner.clone(),
            current: self.current.clone(),
            turn,
        }
    }

    fn is_retired(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.turn
    }
}

impl Read for SharedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("input lock poisoned"))?;
        if self.is_retired() {
            return Ok(0);
        }
        let n = inner.read(buf)?;
        if n > 0 && self.is_retired() {
            inner.unread(n);
            return Ok(0);
        }
        Ok(n)
    }
}

/// Host stdin read directly from descriptor 0 with a poll timeout.
///
/// Going around `std::io::Stdin` keeps bytes from being parked in its
/// internal buffer where a later `poll` cannot see them.
#[cfg(unix)]
pub struct PolledStdin {
    poll_interval: Duration,
}

#[cfg(unix)]
impl PolledStdin {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

#[cfg(unix)]
impl Read for PolledStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = self.poll_interval.as_millis().min(i32::MAX as u128) as libc::c_int;
        // SAFETY: one valid pollfd for the duration of the call
        let ready = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
        if ready < 0 {
            return Err(io::Error::last_os_error());
        }
        if ready == 0 {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "stdin not ready"));
        }
        // SAFETY: buf is valid for buf.len() bytes
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

/// How a pump ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEnd {
    /// Source reached end-of-file
    Eof,
    /// The stop flag was raised
    Stopped,
    /// Source or destination failed
    Failed,
}

/// Copy `from` into `to` until EOF, a hard error, or `stop` is raised.
///
/// Retryable read errors (`Interrupted`, `WouldBlock`, `TimedOut`) loop back
/// after checking `stop`. With `scrub` set the copy buffer is zeroed after
/// every chunk, for streams that may carry passwords.
pub fn pump<R, W>(
    mut from: R,
    mut to: W,
    stop: Option<&AtomicBool>,
    scrub: bool,
    label: &str,
) -> PumpEnd
where
    R: Read,
    W: Write,
{
    let mut buf = [0u8; PUMP_BUFFER_SIZE];
    let stopped = || stop.is_some_and(|flag| flag.load(Ordering::SeqCst));

    let end = loop {
        if stopped() {
            break PumpEnd::Stopped;
        }
        match from.read(&mut buf) {
            Ok(0) => break PumpEnd::Eof,
            Ok(n) => {
                let written = to.write_all(&buf[..n]).and_then(|_| to.flush());
                if scrub {
                    buf[..n].zeroize();
                }
                if let Err(e) = written {
                    debug!("{} pump: destination closed: {}", label, e);
                    break PumpEnd::Failed;
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(e) => {
                // A PTY master reports EIO once the slave side is gone
                debug!("{} pump: read ended ({}): {}", label, e.kind(), e);
                break PumpEnd::Failed;
            }
        }
    };
    debug!("{} pump exiting ({:?})", label, end);
    end
}
