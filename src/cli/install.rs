use super::common::{CliContext, CliOptions, command_failed};
use crate::commands::{self, InstallCommand};
use crate::models::{AddonType, Channel};
use anyhow::Result;
use clap::{ArgGroup, Args};
use colored::Colorize;

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("origin").required(true).args(["url", "tukui", "wowi", "wago"])
))]
pub struct InstallArgs {
    /// Git repository or catalog page URL
    url: Option<String>,

    /// Tukui add-on slug
    #[arg(long, value_name = "SLUG")]
    tukui: Option<String>,

    /// WoWInterface add-on id
    #[arg(long, value_name = "ID")]
    wowi: Option<String>,

    /// Wago add-on id
    #[arg(long, value_name = "ID")]
    wago: Option<String>,

    /// Release channel to follow (alpha, beta or stable)
    #[arg(long, value_name = "CHANNEL")]
    channel: Option<Channel>,
}

impl InstallArgs {
    pub(super) fn command(self) -> InstallCommand {
        let command = match (self.url, self.tukui, self.wowi, self.wago) {
            (Some(url), ..) => InstallCommand::from_url(url),
            (_, Some(slug), ..) => InstallCommand::from_catalog(AddonType::Tukui, slug),
            (_, _, Some(id), _) => InstallCommand::from_catalog(AddonType::WowInterface, id),
            (.., Some(id)) => InstallCommand::from_catalog(AddonType::Wago, id),
            // clap requires one of the four
            (None, None, None, None) => InstallCommand::from_url(String::new()),
        };
        match self.channel {
            Some(channel) => command.with_channel(channel),
            None => command,
        }
    }

    pub async fn execute(self, options: &CliOptions) -> Result<()> {
        let cli = CliContext::load(options).await?;
        let mut command = self.command();
        let report = commands::run(&mut command, &cli.commands).await.map_err(command_failed)?;

        println!("{} {}", "Installed".green().bold(), report.parent.bold());
        for folder in report.installed_addons.iter().filter(|f| **f != report.parent) {
            println!("  {} {}", "+".green(), folder);
        }
        Ok(())
    }
}
