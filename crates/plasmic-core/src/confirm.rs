//! Yes/no decisions taken during a sync.
//!
//! The engine never prompts by itself. It asks a [`Confirmer`], which the
//! CLI backs with a terminal prompt and tests back with canned answers.

use std::cell::RefCell;

use crate::Result;

/// Answers yes/no questions raised while syncing.
pub trait Confirmer {
    /// Ask `message`; `default` is the answer when nobody is there to ask.
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// Non-interactive mode: every question takes its default answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeDefaults;

impl Confirmer for AssumeDefaults {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        tracing::debug!(message, default, "assuming default answer");
        Ok(default)
    }
}

/// Answers every question with the same value and records what was asked.
#[derive(Debug, Default)]
pub struct FixedAnswer {
    answer: bool,
    asked: RefCell<Vec<String>>,
}

impl FixedAnswer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Confirmer for FixedAnswer {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        self.asked.borrow_mut().push(message.to_string());
        Ok(self.answer)
    }
}
