//! Terminal prompts backed by dialoguer.

use std::io::IsTerminal;

use dialoguer::{Confirm, Input, Password, Select};
use vishop_core::contract::Prompter;
use vishop_core::VishopError;

/// Whether stdin is attached to a terminal, i.e. prompts can be answered.
pub fn stdin_is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

fn prompt_error(e: dialoguer::Error) -> VishopError {
    match e {
        dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
            VishopError::Cancelled
        }
        other => VishopError::Prompt(other.to_string()),
    }
}

/// Answers prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str) -> vishop_core::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn password(&self, prompt: &str) -> vishop_core::Result<String> {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(prompt_error)
    }

    fn confirm(&self, prompt: &str) -> vishop_core::Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }

    fn select(&self, prompt: &str, items: &[String]) -> vishop_core::Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(prompt_error)
    }
}
