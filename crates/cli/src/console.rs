//! Interactive port implementations for terminal sessions.

use std::io::{self, BufRead, Write};

use roastery_storefront::{ConfirmationPort, NotificationPort};

/// Confirmation port that prompts on stderr and reads a y/N answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmation;

impl ConfirmationPort for StdinConfirmation {
    #[allow(clippy::print_stderr)]
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Notification port that writes diagnostics to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl NotificationPort for ConsoleNotifier {
    #[allow(clippy::print_stderr)]
    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}
