//! Property-based tests for command validation

use krnr::commands::{prepare_command, sanitize_command, validate_command};
use krnr::{Error, ValidationError};
use proptest::prelude::*;

const SUBSTITUTED: &[char] = &[
    '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{00A0}', '\u{200B}', '\u{200E}',
    '\u{200F}', '\0',
];

fn editor_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9 ./-]",
            prop::sample::select(SUBSTITUTED.to_vec()).prop_map(String::from),
        ],
        0..60,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn test_validate_doesnt_panic(s in "\\PC*") {
        let _ = validate_command(&s);
    }

    #[test]
    fn test_sanitize_removes_every_substituted_char(s in editor_text()) {
        let clean = sanitize_command(&s);
        prop_assert!(!clean.chars().any(|c| SUBSTITUTED.contains(&c)));
    }

    #[test]
    fn test_sanitize_is_idempotent(s in editor_text()) {
        let once = sanitize_command(&s);
        prop_assert_eq!(sanitize_command(&once), once);
    }

    #[test]
    fn test_sanitize_never_introduces_newlines(s in "[^\n]{0,100}") {
        prop_assert!(!sanitize_command(&s).contains('\n'));
    }

    #[test]
    fn test_printable_commands_prepare_cleanly(s in "\\PC{0,100}") {
        let sanitized = sanitize_command(&s);
        match prepare_command(&s) {
            Ok(cmd) => prop_assert_eq!(cmd, sanitized),
            Err(Error::InvalidCommand { reason, .. }) => {
                prop_assert_eq!(reason, ValidationError::Empty);
                prop_assert!(sanitized.trim().is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_rejects_embedded_newlines(
        prefix in "[a-z]{1,20}",
        suffix in "[a-z]{0,20}",
    ) {
        let cmd = format!("{}\n{}", prefix, suffix);
        match validate_command(&cmd) {
            Err(Error::InvalidCommand { reason, .. }) => prop_assert_eq!(reason, ValidationError::Newline),
            other => prop_assert!(false, "expected newline rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_null_bytes_but_prepare_strips_them(
        prefix in "[a-z]{1,20}",
        suffix in "[a-z]{0,20}",
    ) {
        let cmd = format!("{}\0{}", prefix, suffix);
        prop_assert!(validate_command(&cmd).is_err());
        prop_assert_eq!(prepare_command(&cmd).unwrap(), format!("{}{}", prefix, suffix));
    }

    #[test]
    fn test_smart_quoted_words_become_ascii(words in prop::collection::vec("[a-z]{1,10}", 1..6)) {
        let fancy: Vec<String> = words.iter().map(|w| format!("\u{201C}{}\u{201D}", w)).collect();
        let plain: Vec<String> = words.iter().map(|w| format!("\"{}\"", w)).collect();
        prop_assert_eq!(
            prepare_command(&format!("echo {}", fancy.join(" "))).unwrap(),
            format!("echo {}", plain.join(" "))
        );
    }

    #[test]
    fn test_command_with_dashes(
        cmd in "[a-z]{1,10}",
        flags in prop::collection::vec("-[a-z]", 0..5),
    ) {
        let full_cmd = format!("{} {}", cmd, flags.join(" "));
        prop_assert!(validate_command(&full_cmd).is_ok());
    }
}
