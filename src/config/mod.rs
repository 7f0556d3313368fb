//! Configuration management for WAM
//!
//! Commands never read the configuration file themselves. They go through a
//! [`ConfigStore`], which hands out a [`Settings`] snapshot and lets Remove drop
//! references to an add-on that no longer exists.
//!
//! Two stores ship with the crate:
//!
//! - [`FileConfigStore`] - backed by `~/.wam/config.toml` (or `WAM_CONFIG_PATH`)
//! - [`StaticConfig`] - in-memory, for tests and embedding
//!
//! ```rust,no_run
//! use wam_cli::config::{ConfigStore, FileConfigStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = FileConfigStore::load_default().await?;
//! let settings = store.get();
//! println!("updating {} add-ons at a time", settings.concurrency());
//! # Ok(())
//! # }
//! ```

pub mod global;

pub use global::{
    ApiKeys, BackupPolicy, Endpoints, Settings, config_dir, default_config_path,
};

use anyhow::Result;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Source of settings for commands and the orchestrator.
pub trait ConfigStore: Send + Sync {
    /// A snapshot of the current settings.
    fn get(&self) -> Settings;

    /// Drops every reference to `folder` from the configuration.
    fn forget_addon<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Settings persisted to a TOML file.
pub struct FileConfigStore {
    path: PathBuf,
    settings: Mutex<Settings>,
}

impl FileConfigStore {
    /// Loads `path`, falling back to defaults when it does not exist yet.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            Settings::load_from(&path).await?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Settings::default()
        };
        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    /// Loads the file at [`default_config_path`].
    pub async fn load_default() -> Result<Self> {
        Self::load(default_config_path()?).await
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` and writes the file.
    pub async fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<()> {
        let snapshot = {
            let mut settings = self
                .settings
                .lock()
                .map_err(|_| anyhow::anyhow!("Config lock poisoned"))?;
            change(&mut settings);
            settings.clone()
        };
        snapshot.save_to(&self.path).await
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self) -> Settings {
        self.settings.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn forget_addon<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.get().ignored.contains(folder) {
                return Ok(());
            }
            self.update(|settings| {
                settings.ignored.remove(folder);
            })
            .await
        })
    }
}

/// Fixed in-memory settings.
#[derive(Default)]
pub struct StaticConfig {
    settings: Mutex<Settings>,
    forgotten: Mutex<Vec<String>>,
}

impl StaticConfig {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            forgotten: Mutex::new(Vec::new()),
        }
    }

    pub fn update(&self, change: impl FnOnce(&mut Settings)) {
        if let Ok(mut settings) = self.settings.lock() {
            change(&mut settings);
        }
    }

    /// Folders passed to [`ConfigStore::forget_addon`] so far.
    #[must_use]
    pub fn forgotten(&self) -> Vec<String> {
        self.forgotten.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl ConfigStore for StaticConfig {
    fn get(&self) -> Settings {
        self.settings.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn forget_addon<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Ok(mut settings) = self.settings.lock() {
                settings.ignored.remove(folder);
            }
            if let Ok(mut forgotten) = self.forgotten.lock() {
                forgotten.push(folder.to_string());
            }
            Ok(())
        })
    }
}
