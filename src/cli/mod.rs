//! Command-line interface for WAM.
//!
//! Each subcommand lives in its own module with a clap `Args` struct and an
//! `execute` method. They all go through [`common::CliContext`], which loads
//! the settings, opens the add-on repository and wires the source clients,
//! so the subcommands only translate arguments into command objects and
//! render the outcome.
//!
//! # Logging
//!
//! `RUST_LOG` wins when set. Otherwise `--verbose` logs debug output,
//! `--quiet` only errors, and the default shows WAM's own info messages and
//! warnings from everything else.
//!
//! # Examples
//!
//! ```bash
//! wam install https://github.com/user/RepoAddon
//! wam install --tukui elvui
//! wam install --wago aZz2s0Nk --channel beta
//! wam update --all
//! wam check
//! wam remove Bagnon
//! ```

mod backup;
mod check;
pub mod common;
mod install;
mod list;
mod remove;
mod scan;
mod update;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tracing targets WAM logs under.
const LOG_TARGETS: &[&str] =
    &["commands", "git", "installer", "orchestrator", "ownership", "repository", "source"];

#[derive(Parser, Debug)]
#[command(
    name = "wam",
    about = "WAM - manage World of Warcraft add-ons from git, WoWInterface, Tukui and Wago",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file (defaults to ~/.wam/config.toml)
    #[arg(short, long, global = true, env = "WAM_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Do not draw progress spinners
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install an add-on from a URL or a catalog
    Install(install::InstallArgs),
    /// Update tracked add-ons
    Update(update::UpdateArgs),
    /// Check tracked add-ons for newer versions without installing
    Check(check::CheckArgs),
    /// Remove an add-on and the folders it owns
    Remove(remove::RemoveArgs),
    /// Record add-on folders found in the destination
    Scan(scan::ScanArgs),
    /// List tracked add-ons
    List(list::ListArgs),
    /// Back up the game's settings directory
    Backup(backup::BackupArgs),
}

impl Cli {
    /// The tracing filter selected by the flags.
    #[must_use]
    pub fn log_filter(&self) -> String {
        if self.verbose {
            "debug,hyper=info,hyper_util=info,reqwest=info,h2=info".to_string()
        } else if self.quiet {
            "error".to_string()
        } else {
            std::iter::once("warn".to_string())
                .chain(LOG_TARGETS.iter().map(|target| format!("{target}=info")))
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    /// Installs the global subscriber, writing to stderr.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_filter())
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .try_init();
    }

    pub async fn execute(self) -> Result<()> {
        let options = common::CliOptions {
            config_path: self.config,
            progress: !self.no_progress && !self.quiet,
        };
        match self.command {
            Commands::Install(args) => args.execute(&options).await,
            Commands::Update(args) => args.execute(&options).await,
            Commands::Check(args) => args.execute(&options).await,
            Commands::Remove(args) => args.execute(&options).await,
            Commands::Scan(args) => args.execute(&options).await,
            Commands::List(args) => args.execute(&options).await,
            Commands::Backup(args) => args.execute(&options).await,
        }
    }
}
