use super::common::{CliContext, CliOptions};
use crate::orchestrator::CheckStatus;
use crate::utils::progress::ProgressBar;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Exit with status 1 when an update is available
    #[arg(long)]
    exit_code: bool,
}

impl CheckArgs {
    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;

        let spinner = options.progress.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message("Checking for updates");
            spinner
        });
        let entries = cli.orchestrator().check_all().await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let mut available = 0;
        for entry in &entries {
            match &entry.status {
                CheckStatus::UpToDate {
                    version,
                } => println!("{} {} ({})", "Current".dimmed(), entry.folder, version),
                CheckStatus::UpdateAvailable {
                    installed,
                    remote,
                } => {
                    available += 1;
                    println!(
                        "{} {} {} -> {}",
                        "Outdated".yellow().bold(),
                        entry.folder.bold(),
                        installed,
                        remote
                    );
                }
                CheckStatus::Failed(error) => {
                    println!("{} {}: {}", "Failed".red().bold(), entry.folder.bold(), error);
                }
            }
        }
        println!("{available} of {} add-ons can be updated", entries.len());

        if self.exit_code && available > 0 {
            std::process::exit(1);
        }
        Ok(())
    }
}
