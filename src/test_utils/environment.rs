//! A throwaway WAM installation for tests.

use super::doubles::RecordingSink;
use crate::commands::CommandContext;
use crate::config::{Settings, StaticConfig};
use crate::installer::{FolderCopier, Installer};
use crate::repository::AddonRepository;
use crate::source::{GitClient, HttpClient, SourceClient, SourceRegistry};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Destination, repository and settings inside one temporary directory.
///
/// ```text
/// <temp>/
///   game/_retail_/Interface/AddOns/   destination
///   game/_retail_/WTF/                settings backed up by the orchestrator
///   archives/                         fixture archives
///   backups/                          settings backup target
///   addons.toml                       repository
/// ```
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub destination: PathBuf,
    pub archives: PathBuf,
    pub config: Arc<StaticConfig>,
    pub repository: Arc<AddonRepository>,
    pub events: Arc<RecordingSink>,
    sources: SourceRegistry,
    copier: Option<Arc<dyn FolderCopier>>,
}

impl TestEnvironment {
    /// An environment with the destination configured and the git client
    /// registered.
    pub async fn new() -> Result<Self> {
        Self::build(true).await
    }

    /// An environment whose settings have no destination.
    pub async fn unconfigured() -> Result<Self> {
        Self::build(false).await
    }

    async fn build(configured: bool) -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let game = temp_dir.path().join("game").join("_retail_");
        let destination = game.join("Interface").join("AddOns");
        let archives = temp_dir.path().join("archives");
        std::fs::create_dir_all(&destination)?;
        std::fs::create_dir_all(game.join("WTF"))?;
        std::fs::create_dir_all(&archives)?;

        let mut settings = Settings::default();
        if configured {
            settings.destination = Some(destination.display().to_string());
        }
        settings.backup.directory = Some(temp_dir.path().join("backups").display().to_string());
        settings.repository_path = Some(temp_dir.path().join("addons.toml").display().to_string());

        let repository =
            Arc::new(AddonRepository::open(temp_dir.path().join("addons.toml")).await?);
        let mut sources = SourceRegistry::new();
        sources.register(Arc::new(GitClient::new()));

        Ok(Self {
            temp_dir,
            destination,
            archives,
            config: Arc::new(StaticConfig::new(settings)),
            repository,
            events: Arc::new(RecordingSink::new()),
            sources,
            copier: None,
        })
    }

    /// Registers `client`, replacing any client of the same type.
    pub fn register(&mut self, client: Arc<dyn SourceClient>) {
        self.sources.register(client);
    }

    /// Makes the installer write folders through `copier`.
    pub fn set_copier(&mut self, copier: Arc<dyn FolderCopier>) {
        self.copier = Some(copier);
    }

    /// A context over this environment that records events.
    pub fn context(&self) -> Result<CommandContext> {
        let mut installer = Installer::new(HttpClient::new()?);
        if let Some(copier) = &self.copier {
            installer = installer.with_copier(Arc::clone(copier));
        }
        Ok(CommandContext::new(
            Arc::clone(&self.repository),
            self.sources.clone(),
            self.config.clone(),
            installer,
        )
        .with_events(self.events.clone()))
    }

    /// Path of a folder inside the destination.
    #[must_use]
    pub fn folder(&self, name: &str) -> PathBuf {
        self.destination.join(name)
    }

    /// Path for a fixture archive.
    #[must_use]
    pub fn archive(&self, name: &str) -> PathBuf {
        self.archives.join(name)
    }
}
