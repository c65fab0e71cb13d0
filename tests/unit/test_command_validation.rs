//! Unit tests for command validation
//!
//! These tests cover sanitization and validation through the public API.

use krnr::commands::{prepare_command, sanitize_command, validate_command};
use krnr::{Error, ValidationError};

#[cfg(test)]
mod sanitize_tests {
    use super::*;

    #[test]
    fn test_smart_quotes_become_ascii() {
        assert_eq!(
            sanitize_command("echo \u{201C}hello\u{201D} \u{2018}world\u{2019}"),
            "echo \"hello\" 'world'"
        );
    }

    #[test]
    fn test_no_break_space_becomes_space() {
        assert_eq!(sanitize_command("ls\u{00A0}-la"), "ls -la");
    }

    #[test]
    fn test_invisible_marks_are_removed() {
        assert_eq!(sanitize_command("ec\u{200B}ho\u{200E} hi\u{200F}"), "echo hi");
    }

    #[test]
    fn test_nul_bytes_are_removed() {
        assert_eq!(sanitize_command("echo\0 hi"), "echo hi");
    }

    #[test]
    fn test_plain_command_unchanged() {
        let cmd = "git log --oneline | head -n 5";
        assert_eq!(sanitize_command(cmd), cmd);
    }

    #[test]
    fn test_other_unicode_is_kept() {
        assert_eq!(sanitize_command("echo café 日本"), "echo café 日本");
    }
}

#[cfg(test)]
mod validate_tests {
    use super::*;

    fn reason(result: krnr::Result<()>) -> ValidationError {
        match result {
            Err(Error::InvalidCommand { reason, .. }) => reason,
            other => panic!("expected InvalidCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_simple_command() {
        assert!(validate_command("ls").is_ok());
        assert!(validate_command("ls -la /tmp").is_ok());
    }

    #[test]
    fn test_tab_is_allowed() {
        assert!(validate_command("printf 'a\tb'").is_ok());
    }

    #[test]
    fn test_empty_and_blank_rejected() {
        assert_eq!(reason(validate_command("")), ValidationError::Empty);
        assert_eq!(reason(validate_command("   \t ")), ValidationError::Empty);
    }

    #[test]
    fn test_newline_rejected() {
        assert_eq!(reason(validate_command("echo a\necho b")), ValidationError::Newline);
    }

    #[test]
    fn test_control_character_position_reported() {
        assert_eq!(
            reason(validate_command("echo\x07")),
            ValidationError::ControlCharacter { position: 4 }
        );
    }

    #[test]
    fn test_carriage_return_is_a_control_character() {
        assert!(matches!(
            reason(validate_command("echo a\r")),
            ValidationError::ControlCharacter { .. }
        ));
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = validate_command("a\nb").unwrap_err();
        assert!(err.to_string().contains("newline"));

        let err = validate_command("a\x01").unwrap_err();
        assert!(err.to_string().contains("control characters"));
    }

    #[test]
    fn test_very_long_command_is_accepted() {
        let long_cmd = format!("echo {}", "a".repeat(100_000));
        assert!(validate_command(&long_cmd).is_ok());
    }

    #[test]
    fn test_error_truncates_command() {
        let long_cmd = format!("{}\n", "x".repeat(200));
        match validate_command(&long_cmd) {
            Err(Error::InvalidCommand { command, .. }) => assert_eq!(command.chars().count(), 50),
            other => panic!("expected InvalidCommand, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod prepare_tests {
    use super::*;

    #[test]
    fn test_prepare_sanitizes_before_validating() {
        // NUL would fail validation if it were not stripped first
        assert_eq!(prepare_command("echo\0 \u{201C}ok\u{201D}").unwrap(), "echo \"ok\"");
    }

    #[test]
    fn test_prepare_rejects_what_sanitizing_cannot_fix() {
        assert!(prepare_command("echo a\necho b").is_err());
        assert!(prepare_command("\u{200B}").is_err());
    }
}

#[cfg(test)]
mod content_tests {
    use super::*;

    #[test]
    fn test_command_content_is_never_judged() {
        for cmd in [
            "rm -rf /tmp/build",
            "sudo rm -rf /var/cache/krnr",
            "apt-get remove foo",
            "yum remove foo",
            "dd if=/dev/zero of=./disk.img bs=1M count=1",
            "mkfs.ext4 ./disk.img",
        ] {
            assert_eq!(prepare_command(cmd).unwrap(), cmd);
        }
    }
}
