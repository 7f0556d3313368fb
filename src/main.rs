//! WAM CLI entry point
//!
//! Parses the command line, sets up logging and runs the subcommand. Errors
//! are rendered with suggestions and exit with status 1.

use anyhow::Result;
use clap::Parser;
use wam_cli::cli;
use wam_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.init_logging();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
