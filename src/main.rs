//! prompt-gateway command-line front-end.

mod cli;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let args = cli::Cli::parse();
    cli::init_logging(args.verbose, args.log_format);
    cli::run(args).await
}
