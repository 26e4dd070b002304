//! Interactive chat loop.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::common::{query_and_record, render_error, render_response, AppContext, CtrlCCancel};

const HELP: &str = "Commands: /stats  /clear  /history  /help  /quit";

/// Run an interactive session. All turns share one response cache.
pub(crate) async fn cmd_chat(ctx: &AppContext, guest: bool) -> Result<()> {
    let identity = ctx.identity(guest)?;
    let gateway = ctx.gateway()?;
    let history = ctx.history();
    let persona = gateway.persona();

    println!("{}", persona.banner());
    println!("Signed in as {} ({})", identity.name, identity.display_role());
    println!("{}", HELP);

    let mut editor = DefaultEditor::new().with_context(|| "Failed to initialize line editor")?;
    let prompt_label = format!("{}> ", persona.name.to_lowercase());

    loop {
        let line = match tokio::task::block_in_place(|| editor.readline(&prompt_label)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).with_context(|| "Failed to read input"),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/stats" => {
                let stats = gateway.cache_stats();
                println!(
                    "cache: {} entries, {} hits, {} misses",
                    stats.entries, stats.hits, stats.misses
                );
                continue;
            }
            "/clear" => {
                gateway.clear_cache();
                println!("Response cache cleared.");
                continue;
            }
            "/history" => {
                for entry in history.recent(&identity.name, 15)? {
                    println!("- {} | {}", entry.date.format("%Y-%m-%d %H:%M"), entry.title);
                }
                continue;
            }
            _ => {}
        }

        let cancel = CtrlCCancel::arm();
        match query_and_record(&gateway, &history, &identity.name, input, cancel.token()).await {
            Ok(response) => println!("{}\n", render_response(&response)),
            Err(err) => eprintln!("{}\n", render_error(&err)),
        }
    }

    Ok(())
}
