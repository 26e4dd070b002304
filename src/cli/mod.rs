//! CLI argument definitions and command dispatch.

mod ask;
mod chat;
mod common;
mod history;
mod users;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use common::AppContext;

#[derive(Parser, Debug)]
#[command(name = "prompt-gateway", version, about = "Cached, search-grounded Gemini prompts")]
pub(crate) struct Cli {
    /// Config file (default: ~/.prompt-gateway/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging for this crate
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Ask a single question (Ctrl+C cancels the request)
    Ask {
        /// Prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
        /// Skip login and run as guest
        #[arg(long)]
        guest: bool,
    },
    /// Interactive session sharing one response cache
    Chat {
        /// Skip login and run as guest
        #[arg(long)]
        guest: bool,
    },
    /// Ask the model to refactor a source file
    Refactor {
        /// File to refactor
        file: PathBuf,
    },
    /// Show or clear recent prompts
    History {
        /// Number of entries to show
        #[arg(long, default_value_t = 15)]
        limit: usize,
        /// Delete the history instead of listing it
        #[arg(long)]
        clear: bool,
        /// Skip login and use the guest history
        #[arg(long)]
        guest: bool,
    },
    /// Manage provisioned identities
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum UsersAction {
    /// Provision a new identity (secret is read from the terminal).
    /// The first identity must be an administrator; later ones need an
    /// administrator login.
    Add {
        name: String,
        /// Role, e.g. "contributor" or "senior-data-manager"
        #[arg(long, default_value = "contributor")]
        role: String,
    },
    /// List provisioned identities (administrator login required)
    List,
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
pub(crate) fn init_logging(verbose: bool, format: LogFormat) {
    let default = if verbose {
        "prompt_gateway=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub(crate) async fn run(args: Cli) -> Result<()> {
    let ctx = AppContext::load(args.config.as_deref())?;
    match args.command {
        Command::Ask { prompt, guest } => ask::cmd_ask(&ctx, &prompt.join(" "), guest).await,
        Command::Chat { guest } => chat::cmd_chat(&ctx, guest).await,
        Command::Refactor { file } => ask::cmd_refactor(&ctx, &file).await,
        Command::History {
            limit,
            clear,
            guest,
        } => history::cmd_history(&ctx, limit, clear, guest),
        Command::Users { action } => users::cmd_users(&ctx, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::parse_from(["prompt-gateway", "ask", "fix", "bug", "--guest"]);
        match cli.command {
            Command::Ask { prompt, guest } => {
                assert_eq!(prompt.join(" "), "fix bug");
                assert!(guest);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["prompt-gateway", "chat", "-v", "--log-format", "json"]);
        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_cli_users_add_default_role() {
        let cli = Cli::parse_from(["prompt-gateway", "users", "add", "alice"]);
        match cli.command {
            Command::Users {
                action: UsersAction::Add { name, role },
            } => {
                assert_eq!(name, "alice");
                assert_eq!(role, "contributor");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_prompt() {
        assert!(Cli::try_parse_from(["prompt-gateway", "ask"]).is_err());
    }
}
