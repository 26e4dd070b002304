//! Prompt history command handler.

use anyhow::Result;

use super::common::AppContext;

/// List or clear the current identity's recent prompts.
pub(crate) fn cmd_history(ctx: &AppContext, limit: usize, clear: bool, guest: bool) -> Result<()> {
    let identity = ctx.identity(guest)?;
    let history = ctx.history();

    if clear {
        history.clear(&identity.name)?;
        println!("History cleared for {}.", identity.name);
        return Ok(());
    }

    let entries = history.recent(&identity.name, limit)?;
    if entries.is_empty() {
        println!("No history for {}.", identity.name);
        return Ok(());
    }
    println!("Recent prompts for {}:", identity.name);
    for entry in entries {
        println!("- {} | {}", entry.date.format("%Y-%m-%d %H:%M"), entry.title);
    }
    Ok(())
}
