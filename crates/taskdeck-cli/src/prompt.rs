use std::io::IsTerminal;

use anyhow::{Context, Result, bail};
use dialoguer::{Confirm, Input};

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Ask for a task description, pre-filled with `initial` when editing.
pub fn ask_description(prompt: &str, initial: Option<&str>) -> Result<String> {
    if !is_interactive() {
        bail!("no task text given and stdin is not a terminal");
    }

    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(initial) = initial {
        input = input.with_initial_text(initial);
    }
    input.interact_text().context("task input cancelled")
}

pub fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("confirmation cancelled")
}
