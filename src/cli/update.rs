use super::common::{CliContext, CliOptions};
use crate::orchestrator::{BackupOutcome, UpdateAllReport};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Folders to update
    #[arg(value_name = "FOLDER", required_unless_present = "all", conflicts_with = "all")]
    folders: Vec<String>,

    /// Update every tracked add-on that is not ignored
    #[arg(long)]
    all: bool,

    /// Reinstall even when the installed version is current
    #[arg(long)]
    force: bool,
}

impl UpdateArgs {
    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;
        let orchestrator = cli.orchestrator();
        let report = if self.all {
            orchestrator.update_all(self.force).await
        } else {
            orchestrator.update(&self.folders, self.force).await
        };
        print_report(&report);

        let failed = report.failures().len();
        if failed > 0 {
            bail!("{failed} of {} add-ons failed to update", report.entries.len());
        }
        Ok(())
    }
}

fn print_report(report: &UpdateAllReport) {
    match &report.backup {
        Some(Ok(BackupOutcome::Created {
            path,
            ..
        })) => println!("{} {}", "Settings backed up to".dimmed(), path.display()),
        Some(Err(message)) => println!("{} {}", "Settings backup failed:".yellow(), message),
        _ => {}
    }

    for entry in &report.entries {
        match &entry.result {
            Ok(update) if update.updated => println!(
                "{} {} {} -> {}",
                "Updated".green().bold(),
                entry.folder.bold(),
                update.previous_version,
                update.remote_version
            ),
            Ok(update) => {
                println!("{} {} ({})", "Current".dimmed(), entry.folder, update.previous_version);
            }
            Err(error) => println!("{} {}: {}", "Failed".red().bold(), entry.folder.bold(), error),
        }
    }

    if report.entries.is_empty() {
        println!("No add-ons to update");
    }
}
