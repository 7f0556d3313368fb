use super::common::{CliContext, CliOptions};
use crate::models::{AddonKind, AddonRecord};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    format: String,

    /// Also list libraries
    #[arg(long)]
    libraries: bool,

    /// Show owned folders under each add-on
    #[arg(long)]
    detailed: bool,
}

impl ListArgs {
    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;
        let records: Vec<AddonRecord> = cli
            .commands
            .repository
            .all()
            .into_iter()
            .filter(|r| self.libraries || r.kind != AddonKind::Library)
            .collect();

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("No add-ons tracked. Run 'wam scan' to record installed folders.");
            return Ok(());
        }

        let ignored = cli.settings().ignored;
        let width = records.iter().map(|r| r.folder.len()).max().unwrap_or(0);
        for record in &records {
            let mut line = format!(
                "{:<width$}  {:<12}  {:<14}",
                record.folder,
                record.version,
                record.addon_type().to_string()
            );
            if let Some(remote) = record.remote_version.as_deref().filter(|r| *r != record.version) {
                line.push_str(&format!("  {}", format!("-> {remote}").yellow()));
            }
            if ignored.contains(&record.folder) {
                line.push_str(&format!("  {}", "(ignored)".dimmed()));
            }
            println!("{line}");

            if self.detailed {
                for owned in &record.owned_folders {
                    println!("  {} {}", "└".dimmed(), owned);
                }
            }
        }
        Ok(())
    }
}
