//! Confirmation gate for destructive operations.

/// Synchronous yes/no gate shown before a destructive edit.
///
/// The widget host supplies the real prompt; a declined confirmation is a
/// normal no-op, not an error.
pub trait Confirm {
    /// Present `message` and return whether the user accepted.
    fn confirm(&self, message: &str) -> bool;
}

/// Accepts every prompt. Useful for tests and headless batch edits.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Confirm for AcceptAll {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Declines every prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineAll;

impl Confirm for DeclineAll {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_and_decline() {
        assert!(AcceptAll.confirm("Are you sure?"));
        assert!(!DeclineAll.confirm("Are you sure?"));
    }
}
