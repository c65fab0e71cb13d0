//! Command line sanitization and validation
//!
//! Every command line passes through [`sanitize_command`] and
//! [`validate_command`] immediately before it is handed to a shell.
//! Sanitization repairs punctuation that editors commonly substitute
//! (smart quotes, no-break spaces, zero-width marks) and drops NUL bytes;
//! validation then rejects anything that still cannot be run as a single
//! shell line.

use crate::error::{Error, Result};

/// Reason a command line failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Nothing but whitespace
    #[error("command is empty")]
    Empty,

    /// Contains a line feed
    #[error("contains newline characters; each command must be a single line")]
    Newline,

    /// Contains a control character other than tab
    #[error("contains control characters; remove non-printable characters (at position {position})")]
    ControlCharacter { position: usize },
}

/// Replacements applied by [`sanitize_command`]; `None` removes the character.
const REPLACEMENTS: &[(char, Option<char>)] = &[
    ('\u{2018}', Some('\'')), // left single quote
    ('\u{2019}', Some('\'')), // right single quote
    ('\u{201C}', Some('"')),  // left double quote
    ('\u{201D}', Some('"')),  // right double quote
    ('\u{00A0}', Some(' ')),  // no-break space
    ('\u{200B}', None),       // zero width space
    ('\u{200E}', None),       // left-to-right mark
    ('\u{200F}', None),       // right-to-left mark
    ('\0', None),
];

/// Normalize editor punctuation to ASCII and strip NUL bytes.
///
/// Total and side-effect free. The output never contains a character that
/// was not either in the input or one of the ASCII replacements above, so
/// it cannot introduce a newline or control character.
pub fn sanitize_command(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| {
            match REPLACEMENTS.iter().find(|(from, _)| *from == c) {
                Some((_, to)) => *to,
                None => Some(c),
            }
        })
        .collect()
}

/// Check that a command line can be handed to a shell as one argument.
pub fn validate_command(command: &str) -> Result<()> {
    check_line(command).map_err(|reason| Error::InvalidCommand {
        command: command.chars().take(50).collect(),
        reason,
    })
}

fn check_line(command: &str) -> std::result::Result<(), ValidationError> {
    if command.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    if command.contains('\n') {
        return Err(ValidationError::Newline);
    }
    if let Some(position) = command.chars().position(|c| c.is_control() && c != '\t') {
        return Err(ValidationError::ControlCharacter { position });
    }
    Ok(())
}

/// Sanitize then validate, returning the command that should actually run.
pub fn prepare_command(raw: &str) -> Result<String> {
    let command = sanitize_command(raw);
    validate_command(&command)?;
    Ok(command)
}
