//! Operator confirmation
//!
//! The pipeline never talks to a terminal directly; it asks a
//! [`ConfirmationGate`]. The binary uses [`TerminalConfirm`], tests script
//! their own answers.

use std::io::IsTerminal;

use dialoguer::Confirm;

use crate::error::ConfirmError;

/// Asks the operator to approve a change
pub trait ConfirmationGate {
    /// Show `prompt` and wait for an answer
    ///
    /// # Errors
    /// [`ConfirmError::Declined`] on "no", [`ConfirmError::Interrupted`]
    /// if the prompt is aborted, [`ConfirmError::Terminal`] if it cannot be
    /// shown.
    fn confirm(&self, prompt: &str) -> Result<(), ConfirmError>;
}

impl<T: ConfirmationGate + ?Sized> ConfirmationGate for &T {
    fn confirm(&self, prompt: &str) -> Result<(), ConfirmError> {
        (**self).confirm(prompt)
    }
}

impl<T: ConfirmationGate + ?Sized> ConfirmationGate for Box<T> {
    fn confirm(&self, prompt: &str) -> Result<(), ConfirmError> {
        (**self).confirm(prompt)
    }
}

/// Yes/no prompt on the controlling terminal
///
/// Empty input answers "no". Escape or `q` interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl TerminalConfirm {
    /// Create terminal gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Check if stdin and stderr (where the prompt is drawn) are terminals
    #[must_use]
    pub fn is_available() -> bool {
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }
}

impl ConfirmationGate for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> Result<(), ConfirmError> {
        if !Self::is_available() {
            return Err(ConfirmError::Terminal(
                "interactive confirmation requires a terminal, pass --yes to skip it".into(),
            ));
        }

        let answer = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .show_default(false)
            .wait_for_newline(true)
            .interact_opt()
            .map_err(|e| ConfirmError::Terminal(e.to_string()))?;

        match answer {
            Some(true) => Ok(()),
            Some(false) => Err(ConfirmError::Declined),
            None => Err(ConfirmError::Interrupted),
        }
    }
}
