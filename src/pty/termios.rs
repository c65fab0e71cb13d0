//! Host terminal echo control

use std::io::{self, IsTerminal};
use std::os::fd::AsFd;

use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

/// Turns off echo on the host terminal for as long as it lives.
///
/// While a child owns the controlling terminal its own line discipline
/// echoes keystrokes back through the output stream, so the host terminal
/// must not echo them a second time.
pub struct EchoGuard {
    saved: Option<Termios>,
}

impl EchoGuard {
    /// Disable echo on stdin if it is a terminal; otherwise do nothing.
    pub fn disable() -> Self {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Self { saved: None };
        }

        let saved = match termios::tcgetattr(stdin.as_fd()) {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!("tcgetattr on stdin failed, leaving echo alone: {}", e);
                return Self { saved: None };
            }
        };

        let mut quiet = saved.clone();
        quiet.local_flags.remove(LocalFlags::ECHO);
        if let Err(e) = termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &quiet) {
            debug!("tcsetattr on stdin failed: {}", e);
            return Self { saved: None };
        }

        Self { saved: Some(saved) }
    }

    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            if let Err(e) = termios::tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &saved) {
                warn!("Failed to restore terminal echo: {}", e);
            }
        }
    }
}
