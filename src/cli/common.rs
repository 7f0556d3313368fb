//! Setup shared by every subcommand.

use crate::commands::{CommandContext, CommandError};
use crate::config::{ConfigStore, FileConfigStore, Settings};
use crate::core::WamError;
use crate::events::{EventSink, TracingSink};
use crate::installer::Installer;
use crate::orchestrator::Orchestrator;
use crate::repository::AddonRepository;
use crate::source::{HttpClient, SourceRegistry};
use crate::utils::progress::ProgressSink;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Global flags every subcommand receives.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub progress: bool,
}

/// A loaded configuration with everything commands run against.
pub struct CliContext {
    pub store: Arc<FileConfigStore>,
    pub commands: CommandContext,
}

impl CliContext {
    pub async fn load(options: &CliOptions) -> Result<Self> {
        let store = match &options.config_path {
            Some(path) => FileConfigStore::load(path).await?,
            None => FileConfigStore::load_default().await?,
        };
        let store = Arc::new(store);
        let settings = store.get();
        tracing::debug!(target: "commands", "Using config {}", store.path().display());

        let repository_file = settings.repository_file()?;
        let repository = AddonRepository::open(&repository_file).await.with_context(|| {
            format!("Failed to open the add-on repository at {}", repository_file.display())
        })?;
        let sources = SourceRegistry::from_settings(&settings)?;
        let installer = Installer::new(HttpClient::new()?);

        let events: Arc<dyn EventSink> =
            if options.progress { Arc::new(ProgressSink::new()) } else { Arc::new(TracingSink) };
        let commands = CommandContext::new(Arc::new(repository), sources, store.clone(), installer)
            .with_events(events);

        Ok(Self {
            store,
            commands,
        })
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.store.get()
    }

    #[must_use]
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.commands.clone())
    }
}

/// Turns a refused or failed command into an error the CLI can render with
/// suggestions.
pub fn command_failed(error: CommandError) -> anyhow::Error {
    match error {
        CommandError::NotConfigured => WamError::NotConfigured.into(),
        other => anyhow::Error::new(other),
    }
}
