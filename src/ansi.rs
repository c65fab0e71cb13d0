//! ANSI escape sequence recognition and output sanitization
//!
//! Child output is shown in a scrolling viewport, so anything that could
//! move the cursor, clear the screen or switch screen modes has to go,
//! while SGR colour and style sequences (`ESC [ ... m`) are kept verbatim.
//!
//! Three escape families are recognized:
//!
//! - CSI: `ESC [` parameter bytes, intermediate bytes, one final byte
//! - OSC: `ESC ]` ... terminated by BEL or ST (`ESC \`)
//! - DCS: `ESC P` ... terminated by ST

use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::{Captures, Regex};

/// Escape character
pub const ESC: u8 = 0x1b;

/// Bell character (OSC terminator)
pub const BEL: u8 = 0x07;

const CSI: &str = r"\x1b\[[\x30-\x3f]*[\x20-\x2f]*[\x40-\x7e]";
const OSC: &str = r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)";
const DCS: &str = r"(?s)\x1bP.*?\x1b\\";

static CSI_RE: Lazy<Regex> = Lazy::new(|| compile(CSI));
static OSC_RE: Lazy<Regex> = Lazy::new(|| compile(OSC));
static DCS_RE: Lazy<Regex> = Lazy::new(|| compile(DCS));

/// A complete CSI, OSC or DCS sequence, or a bare string terminator,
/// anchored at the start of the input.
static COMPLETE_AT_START: Lazy<BytesRegex> = Lazy::new(|| {
    BytesRegex::new(&format!(r"(?-u)\A(?:{}|{}|{}|\x1b\\)", CSI, OSC, DCS))
        .unwrap_or_else(|e| unreachable!("escape grammar is a valid regex: {}", e))
});

/// An escape introducer at the very end of the text whose terminator never
/// arrived.
static DANGLING_TAIL: Lazy<Regex> = Lazy::new(|| {
    compile(r"\x1b(?:\[[\x30-\x3f]*[\x20-\x2f]*|\][^\x07\x1b]*\x1b?|(?s:P.*?)\x1b?)?\z")
});

static ANY_SEQUENCE: Lazy<Regex> = Lazy::new(|| compile(&format!("{}|{}|{}", OSC, DCS, CSI)));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("escape grammar is a valid regex: {}", e))
}

/// Make raw terminal text safe for a scrolling viewport.
///
/// 1. CRLF and lone CR become LF
/// 2. OSC sequences and DCS strings are removed
/// 3. CSI sequences are kept when they are SGR (final byte `m`) and removed
///    otherwise
///
/// No other byte is modified.
pub fn sanitize_output(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let without_osc = OSC_RE.replace_all(&normalized, "");
    let without_dcs = DCS_RE.replace_all(&without_osc, "");
    CSI_RE
        .replace_all(&without_dcs, |caps: &Captures| {
            let seq = &caps[0];
            if seq.ends_with('m') {
                seq.to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Whether `bytes` begins with a complete escape sequence of a recognized
/// shape.
pub fn is_complete_sequence(bytes: &[u8]) -> bool {
    COMPLETE_AT_START.is_match(bytes)
}

/// Drop an unterminated escape introducer from the end of `text`.
///
/// Expects sanitized text: complete OSC and DCS strings must already be
/// gone, otherwise a terminated DCS followed by text would be taken as
/// dangling.
pub fn strip_dangling_escape(text: &str) -> &str {
    match DANGLING_TAIL.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Remove every recognized escape sequence, including SGR colour.
pub fn strip_ansi(text: &str) -> String {
    ANY_SEQUENCE.replace_all(text, "").into_owned()
}
