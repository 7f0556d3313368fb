use super::common::{CliContext, CliOptions};
use crate::orchestrator::BackupOutcome;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Back up even when the newest backup is recent
    #[arg(long)]
    force: bool,
}

impl BackupArgs {
    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;
        match cli.orchestrator().backup_settings(self.force).await? {
            BackupOutcome::Created {
                path,
                pruned,
            } => {
                println!("{} {}", "Backed up settings to".green(), path.display());
                if !pruned.is_empty() {
                    println!("Pruned {} old backups", pruned.len());
                }
            }
            BackupOutcome::NotDue {
                newest,
            } => println!(
                "Latest backup {} is recent enough; use --force to back up anyway",
                newest.display()
            ),
        }
        Ok(())
    }
}
