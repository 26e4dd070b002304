//! One-shot `ask` and `refactor` command handlers.

use std::path::Path;

use anyhow::{Context, Result};

use super::common::{query_and_record, render_error, render_response, AppContext, CtrlCCancel};

/// Answer a single prompt.
pub(crate) async fn cmd_ask(ctx: &AppContext, prompt: &str, guest: bool) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("Prompt must not be empty");
    }

    let identity = ctx.identity(guest)?;
    let gateway = ctx.gateway()?;
    let history = ctx.history();

    let cancel = CtrlCCancel::arm();
    match query_and_record(&gateway, &history, &identity.name, prompt, cancel.token()).await {
        Ok(response) => {
            println!("{}", render_response(&response));
            Ok(())
        }
        Err(err) if err.is_cancelled() => {
            eprintln!("{}", render_error(&err));
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!(render_error(&err))),
    }
}

/// Print a refactored version of `file`.
pub(crate) async fn cmd_refactor(ctx: &AppContext, file: &Path) -> Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if code.trim().is_empty() {
        anyhow::bail!("{} is empty", file.display());
    }

    let gateway = ctx.gateway()?;
    let cancel = CtrlCCancel::arm();
    match gateway.refactor(&code, Some(cancel.token())).await {
        Ok(refactored) => {
            println!("{}", refactored);
            Ok(())
        }
        Err(err) if err.is_cancelled() => {
            eprintln!("{}", render_error(&err));
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!(render_error(&err))),
    }
}
