use super::common::{CliContext, CliOptions, command_failed};
use crate::commands::{self, ScanCommand};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Only look at these folders
    #[arg(value_name = "FOLDER")]
    folders: Vec<String>,
}

impl ScanArgs {
    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;
        let mut command = if self.folders.is_empty() {
            ScanCommand::new()
        } else {
            ScanCommand::restricted_to(self.folders)
        };
        let report = commands::run(&mut command, &cli.commands).await.map_err(command_failed)?;

        for folder in &report.added {
            println!("{} {}", "Added".green().bold(), folder);
        }
        for folder in &report.updated {
            println!("{} {}", "Refreshed".cyan(), folder);
        }
        println!(
            "{} added, {} refreshed, {} unchanged",
            report.added.len(),
            report.updated.len(),
            report.unchanged.len()
        );
        Ok(())
    }
}
