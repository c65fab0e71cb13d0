//! Terminal output handling
//!
//! Converts raw child output into the sanitized lines shown to users.

pub mod output;

pub use output::{stream_lines, EscapeAwareSplitter, StreamEnd, MAX_CARRY, READ_CHUNK_SIZE};
