//! Unit tests for chunk-to-line splitting
//!
//! Chunk boundaries are arbitrary; these tests check that escape sequences
//! and multi-byte characters cut by a boundary come out whole.

use std::collections::VecDeque;
use std::io::{self, Read};

use krnr::terminal::{stream_lines, StreamEnd, MAX_CARRY};
use krnr::EscapeAwareSplitter;
use tokio_util::sync::CancellationToken;

/// Reader that returns one scripted chunk per call
struct Chunked(VecDeque<Vec<u8>>);

impl Chunked {
    fn new(chunks: &[&[u8]]) -> Self {
        Self(chunks.iter().map(|c| c.to_vec()).collect())
    }
}

impl Read for Chunked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.pop_front() {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Ok(0),
        }
    }
}

fn split_all(chunks: &[&[u8]]) -> Vec<String> {
    let mut splitter = EscapeAwareSplitter::new();
    let mut lines = Vec::new();
    for chunk in chunks {
        lines.extend(splitter.push(chunk));
    }
    lines.extend(splitter.finish());
    lines
}

#[test]
fn test_private_mode_sequence_split_across_chunks() {
    let lines = split_all(&[b"Hello\x1b[?104", b"9hWorld\n"]);
    assert_eq!(lines.concat(), "HelloWorld");
}

#[test]
fn test_unterminated_sequence_dropped_at_end() {
    let lines = split_all(&[b"Line1\nTrailingText\x1b[38"]);
    assert_eq!(lines, vec!["Line1", "TrailingText"]);
}

#[test]
fn test_sgr_split_at_every_offset_stays_whole() {
    let input = b"\x1b[1;31mred\x1b[0m\n";
    for cut in 1..input.len() {
        let (a, b) = input.split_at(cut);
        let joined = split_all(&[a, b]).concat();
        assert_eq!(joined, "\x1b[1;31mred\x1b[0m", "cut at {}", cut);
    }
}

#[test]
fn test_title_sequence_split_at_every_offset_is_removed() {
    let input = b"a\x1b]0;title\x1b\\b\n";
    for cut in 1..input.len() {
        let (first, second) = input.split_at(cut);
        let joined = split_all(&[first, second]).concat();
        assert_eq!(joined, "ab", "cut at {}", cut);
    }
}

#[test]
fn test_multibyte_character_split() {
    let input = "naïve 日本\n".as_bytes();
    for cut in 1..input.len() {
        let (first, second) = input.split_at(cut);
        assert_eq!(split_all(&[first, second]).concat(), "naïve 日本", "cut at {}", cut);
    }
}

#[test]
fn test_blank_lines_are_skipped() {
    assert_eq!(split_all(&[b"a\n\n\r\nb\n"]), vec!["a", "b"]);
}

#[test]
fn test_progress_carriage_returns_become_lines() {
    assert_eq!(split_all(&[b"10%\r50%\r100%\n"]), vec!["10%", "50%", "100%"]);
}

#[test]
fn test_pending_tracks_held_bytes() {
    let mut splitter = EscapeAwareSplitter::new();
    splitter.push(b"text\x1b[3");
    assert_eq!(splitter.pending(), 3);
    splitter.push(b"2mgreen\n");
    assert_eq!(splitter.pending(), 0);
}

#[test]
fn test_runaway_escape_is_not_held_forever() {
    let mut splitter = EscapeAwareSplitter::new();
    let mut chunk = b"\x1b]".to_vec();
    chunk.extend(std::iter::repeat(b'x').take(MAX_CARRY + 10));
    splitter.push(&chunk);
    assert_eq!(splitter.pending(), 0);
}

#[test]
fn test_stream_lines_reads_to_eof() {
    let mut reader = Chunked::new(&[b"Hello\x1b[?104", b"9hWorld\n", b"tail"]);
    let mut lines = Vec::new();
    let end = stream_lines(&mut reader, &CancellationToken::new(), |line| {
        lines.push(line);
        true
    })
    .unwrap();

    assert_eq!(end, StreamEnd::Eof);
    assert_eq!(lines, vec!["Hello", "World", "tail"]);
}

#[test]
fn test_stream_lines_stops_when_consumer_refuses() {
    let mut reader = Chunked::new(&[b"one\ntwo\nthree\n"]);
    let mut seen = 0;
    let end = stream_lines(&mut reader, &CancellationToken::new(), |_| {
        seen += 1;
        seen < 2
    })
    .unwrap();

    assert_eq!(end, StreamEnd::ConsumerGone);
    assert_eq!(seen, 2);
}

#[test]
fn test_stream_lines_honours_cancellation_before_reading() {
    let token = CancellationToken::new();
    token.cancel();
    let mut reader = Chunked::new(&[b"never read\n"]);
    let end = stream_lines(&mut reader, &token, |_| panic!("no lines expected")).unwrap();
    assert_eq!(end, StreamEnd::Cancelled);
}
