//! Injected UI capabilities.
//!
//! The original surface confirms destructive actions and surfaces
//! diagnostics through blocking browser primitives. Those are modeled as
//! injected ports so the cart logic never touches a terminal or dialog
//! directly; the CLI supplies interactive implementations, tests supply
//! recording fakes.

/// Capability to ask the user to confirm a destructive action.
pub trait ConfirmationPort: Send + Sync {
    /// Returns `true` if the user confirmed the action.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Capability to surface a non-blocking diagnostic to the user.
pub trait NotificationPort: Send + Sync {
    fn notify(&self, message: &str);
}

/// Confirms every prompt. For non-interactive contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmationPort for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl ConfirmationPort for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Forwards diagnostics to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_confirmation_ports() {
        assert!(AlwaysConfirm.confirm("remove item?"));
        assert!(!NeverConfirm.confirm("remove item?"));
    }
}
