//! Approval gate for transitions that discard or interrupt work.
//!
//! The state machines never talk to a display surface. When a transition
//! needs the operator's consent (interrupting a running cycle, discarding
//! unsaved laps) it asks a [`Confirmation`] and does nothing on decline.

pub trait Confirmation {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirmation for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Approves every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl Confirmation for AlwaysApprove {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl Confirmation for AlwaysDecline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}
