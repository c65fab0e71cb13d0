//! Line splitting for child output
//!
//! Output arrives in arbitrary chunks. [`EscapeAwareSplitter`] turns those
//! chunks into sanitized lines without ever cutting an escape sequence (or a
//! UTF-8 character) in half at a chunk boundary; [`stream_lines`] drives it
//! from a reader until EOF or cancellation.

use std::io::{ErrorKind, Read};

use tokio_util::sync::CancellationToken;

use crate::ansi::{is_complete_sequence, sanitize_output, strip_dangling_escape, BEL, ESC};
use crate::error::{Error, Result};

/// Bytes requested per read
pub const READ_CHUNK_SIZE: usize = 4096;

/// Longest suffix held back waiting for an escape sequence to complete.
///
/// Anything longer is treated as ordinary text so a stray ESC cannot make
/// the splitter buffer without bound.
pub const MAX_CARRY: usize = 1024;

/// Stateful chunk-to-line converter.
///
/// Each chunk is appended to the carried-over suffix of the previous one.
/// If the result ends inside an escape sequence (or a multi-byte
/// character), that tail is held back for the next chunk; the rest is split
/// on line feeds, trailing carriage returns are trimmed, each piece is
/// sanitized, and non-empty lines are returned.
#[derive(Debug, Default, Clone)]
pub struct EscapeAwareSplitter {
    carry: Vec<u8>,
}

impl EscapeAwareSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the lines it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(chunk);

        let escape_safe = carry_start(&data).unwrap_or(data.len());
        let safe = escape_safe - incomplete_utf8_tail(&data[..escape_safe]);
        self.carry = data.split_off(safe);

        split_lines(&data)
    }

    /// Flush whatever is still carried at end of stream.
    ///
    /// An escape introducer that never completed is dropped rather than
    /// emitted as text.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.carry);
        if rest.is_empty() {
            return Vec::new();
        }
        let text = String::from_utf8_lossy(&rest);
        let sanitized = sanitize_output(&text);
        let mut lines = Vec::new();
        push_non_empty(&mut lines, strip_dangling_escape(&sanitized));
        lines
    }

    /// Bytes currently held back
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

/// Offset at which `data` stops being safe to process, if it ends inside an
/// escape sequence.
fn carry_start(data: &[u8]) -> Option<usize> {
    let esc = data.iter().rposition(|&b| b == ESC)?;
    let at_end = esc + 1 == data.len();

    if !at_end && is_complete_sequence(&data[esc..]) {
        return None;
    }

    // A lone trailing ESC may be the first half of the ST that closes an
    // OSC or DCS string opened earlier in the buffer.
    let start = if at_end {
        open_string_start(&data[..esc]).unwrap_or(esc)
    } else {
        esc
    };

    if data.len() - start > MAX_CARRY {
        trace!(
            "Escape tail of {} bytes exceeds carry limit, emitting as text",
            data.len() - start
        );
        return None;
    }
    Some(start)
}

/// Start of an OSC or DCS string in `prefix` that has not been terminated.
fn open_string_start(prefix: &[u8]) -> Option<usize> {
    let opener = prefix.iter().rposition(|&b| b == ESC)?;
    match prefix.get(opener + 1) {
        Some(b']') if !prefix[opener..].contains(&BEL) => Some(opener),
        Some(b'P') => Some(opener),
        _ => None,
    }
}

/// Length of a truncated UTF-8 character at the end of `bytes`.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.trim_end_matches('\r');
        if raw.is_empty() {
            continue;
        }
        push_non_empty(&mut lines, &sanitize_output(raw));
    }
    lines
}

/// Sanitizing turns lone CRs into line feeds, so split once more.
fn push_non_empty(lines: &mut Vec<String>, text: &str) {
    lines.extend(
        text.split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );
}

/// How [`stream_lines`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The reader reached end-of-file
    Eof,
    /// The token was cancelled
    Cancelled,
    /// `emit` returned false
    ConsumerGone,
}

/// Read `reader` to the end, handing every completed line to `emit`.
///
/// Retryable read errors (`WouldBlock`, `TimedOut`, `Interrupted`) are how a
/// reader reports "nothing yet"; the token is checked after each one and
/// before every read. Residual output is flushed on EOF, on cancellation and
/// on read failure. `emit` returning false stops the loop immediately.
pub fn stream_lines<R, F>(reader: &mut R, cancel: &CancellationToken, mut emit: F) -> Result<StreamEnd>
where
    R: Read + ?Sized,
    F: FnMut(String) -> bool,
{
    let mut splitter = EscapeAwareSplitter::new();
    let mut buf = [0u8; READ_CHUNK_SIZE];

    let outcome = loop {
        if cancel.is_cancelled() {
            break Ok(StreamEnd::Cancelled);
        }
        match reader.read(&mut buf) {
            Ok(0) => break Ok(StreamEnd::Eof),
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    if !emit(line) {
                        return Ok(StreamEnd::ConsumerGone);
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => break Err(Error::StreamRead { source: e }),
        }
    };

    for line in splitter.finish() {
        if !emit(line) {
            return Ok(StreamEnd::ConsumerGone);
        }
    }
    outcome
}
