//! Property-based tests for output processing
//!
//! The splitter must give the same text however the input is chunked, and
//! must never emit a line break or a cut escape sequence.

use krnr::ansi::{sanitize_output, strip_ansi};
use krnr::EscapeAwareSplitter;
use proptest::prelude::*;

/// Feed `data` cut at the given offsets and collect every emitted line
fn split_at_offsets(data: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut offsets: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut splitter = EscapeAwareSplitter::new();
    let mut lines = Vec::new();
    let mut start = 0;
    for end in offsets.into_iter().chain(std::iter::once(data.len())) {
        if end > start {
            lines.extend(splitter.push(&data[start..end]));
            start = end;
        }
    }
    lines.extend(splitter.finish());
    lines
}

fn coloured(words: &[(u8, String, bool)]) -> String {
    words
        .iter()
        .map(|(colour, word, newline)| {
            format!(
                "\x1b[{}m{}\x1b[0m{}",
                30 + colour % 8,
                word,
                if *newline { "\n" } else { "" }
            )
        })
        .collect()
}

fn screen_noise() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "\x1b[2K",
        "\x1b[?25l",
        "\x1b[10;5H",
        "\x1b[1A",
        "\x1b]0;title\x07",
        "\x1b]2;t\x1b\\",
    ])
}

proptest! {
    #[test]
    fn test_splitter_handles_any_bytes(
        data in prop::collection::vec(any::<u8>(), 0..1000),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        for line in split_at_offsets(&data, &cuts) {
            prop_assert!(!line.is_empty());
            prop_assert!(!line.contains('\n'));
            prop_assert!(!line.contains('\r'));
        }
    }

    #[test]
    fn test_plain_text_is_chunking_invariant(
        text in "[a-zé日 \n]{0,200}",
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let joined = split_at_offsets(text.as_bytes(), &cuts).concat();
        prop_assert_eq!(joined, text.replace('\n', ""));
    }

    #[test]
    fn test_colour_survives_any_chunking(
        words in prop::collection::vec((any::<u8>(), "[a-z]{1,8}", any::<bool>()), 1..20),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let text = coloured(&words);
        let joined = split_at_offsets(text.as_bytes(), &cuts).concat();
        prop_assert_eq!(joined, text.replace('\n', ""));
    }

    #[test]
    fn test_screen_control_removed_under_any_chunking(
        parts in prop::collection::vec(("[a-z]{1,8}", screen_noise()), 1..20),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let text: String = parts.iter().map(|(word, noise)| format!("{}{}", word, noise)).collect();
        let words: String = parts.iter().map(|(word, _)| word.as_str()).collect();
        let joined = split_at_offsets(text.as_bytes(), &cuts).concat();
        prop_assert_eq!(joined, words);
    }

    #[test]
    fn test_sanitize_leaves_printable_text_alone(text in "\\PC{0,200}") {
        prop_assert_eq!(sanitize_output(&text), text);
    }

    #[test]
    fn test_strip_ansi_recovers_words(
        words in prop::collection::vec((any::<u8>(), "[a-z]{1,8}", Just(false)), 0..20),
    ) {
        let text = coloured(&words);
        let expected: String = words.iter().map(|(_, word, _)| word.as_str()).collect();
        prop_assert_eq!(strip_ansi(&sanitize_output(&text)), expected);
    }
}
