use anyhow::Result;
use console::style;

use ai::capabilities::confirm::Confirm;

/// Asks the operator on the terminal before a script runs
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let approved = cliclack::confirm(prompt).initial_value(false).interact()?;
        if !approved {
            eprintln!("{}", style("Script execution declined.").dim());
        }
        Ok(approved)
    }
}
