// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User confirmation.

use inquire::Confirm;

/// Ask user to confirm an action.
pub trait Prompt {
    /// Ask yes or no question.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if no answer could be obtained.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Prompt on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }
}

/// Answer every question the same way without asking anyone.
///
/// Records each question it was asked.
#[derive(Debug, Default, Clone)]
pub struct FixedAnswer {
    answer: bool,
    asked: Vec<String>,
}

impl FixedAnswer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Vec::new(),
        }
    }

    /// Questions asked so far.
    pub fn asked(&self) -> &[String] {
        self.asked.as_slice()
    }
}

impl Prompt for FixedAnswer {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        self.asked.push(message.to_owned());
        Ok(self.answer)
    }
}

/// Failed to obtain answer from user.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct PromptError(#[from] inquire::InquireError);

/// Friendly result alias :3
type Result<T, E = PromptError> = std::result::Result<T, E>;
