use super::common::{CliContext, CliOptions, command_failed};
use crate::commands::{self, RemoveCommand};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Folder of the add-on to remove
    folder: String,
}

impl RemoveArgs {
    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;
        let mut command = RemoveCommand::new(self.folder);
        let report = commands::run(&mut command, &cli.commands).await.map_err(command_failed)?;

        println!("{} {}", "Removed".green().bold(), report.folder.bold());
        for folder in report.removed_folders.iter().filter(|f| **f != report.folder) {
            println!("  {} {}", "-".red(), folder);
        }
        Ok(())
    }
}
