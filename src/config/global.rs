//! User settings stored in `~/.wam/config.toml`.
//!
//! The file holds the destination directory, concurrency limit, API keys and the
//! settings backup policy. Every key has a default so older files keep loading
//! as new keys are added.
//!
//! ```toml
//! destination = "~/Games/World of Warcraft/_retail_/Interface/AddOns"
//! max_concurrency = 4
//! flavor = "retail"
//! ignored = ["MyPatchedAddon"]
//!
//! [api_keys]
//! wago = "wago-api-key"
//!
//! [backup]
//! enabled = true
//! interval_hours = 24
//! keep = 10
//! ```
//!
//! Because it may contain API keys, the file is written with `0o600` permissions
//! on Unix.

use crate::constants::{CONFIG_PATH_ENV, DEFAULT_MAX_CONCURRENCY};
use crate::core::WamError;
use crate::models::Flavor;
use crate::utils::platform::resolve_path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;

const fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

const fn default_interval_hours() -> u64 {
    24
}

const fn default_keep() -> usize {
    10
}

fn default_wowinterface_endpoint() -> String {
    "https://api.mmoui.com/v3/game/WOW".to_string()
}

fn default_tukui_endpoint() -> String {
    "https://api.tukui.org/v1".to_string()
}

fn default_wago_endpoint() -> String {
    "https://addons.wago.io/api/external".to_string()
}

/// All user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// The game's `Interface/AddOns` directory. Unset until the user configures it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Upper bound on add-ons updated at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Game variant used for catalog lookups.
    #[serde(default)]
    pub flavor: Flavor,

    #[serde(default, skip_serializing_if = "ApiKeys::is_empty")]
    pub api_keys: ApiKeys,

    #[serde(default)]
    pub backup: BackupPolicy,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Folders skipped by update-all and check-all.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub ignored: BTreeSet<String>,

    /// Location of `addons.toml`; defaults to the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            destination: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            flavor: Flavor::default(),
            api_keys: ApiKeys::default(),
            backup: BackupPolicy::default(),
            endpoints: Endpoints::default(),
            ignored: BTreeSet::new(),
            repository_path: None,
        }
    }
}

/// Credentials for authenticated catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wago: Option<String>,
}

impl ApiKeys {
    fn is_empty(&self) -> bool {
        self.wago.is_none()
    }
}

/// When and where the `WTF` settings directory is archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPolicy {
    #[serde(default)]
    pub enabled: bool,

    /// Directory to archive; defaults to the `WTF` directory next to `Interface`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Where archives are written; defaults to `backups/` in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Minimum hours between two backups.
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Number of archives kept after pruning.
    #[serde(default = "default_keep")]
    pub keep: usize,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            source: None,
            directory: None,
            interval_hours: default_interval_hours(),
            keep: default_keep(),
        }
    }
}

/// Base URLs of the catalog APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_wowinterface_endpoint")]
    pub wowinterface: String,
    #[serde(default = "default_tukui_endpoint")]
    pub tukui: String,
    #[serde(default = "default_wago_endpoint")]
    pub wago: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            wowinterface: default_wowinterface_endpoint(),
            tukui: default_tukui_endpoint(),
            wago: default_wago_endpoint(),
        }
    }
}

impl Settings {
    /// Resolves the destination directory.
    ///
    /// Returns [`WamError::NotConfigured`] when no destination is set.
    pub fn destination_dir(&self) -> Result<PathBuf, WamError> {
        let raw = self
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(WamError::NotConfigured)?;
        resolve_path(raw).map_err(|e| WamError::ConfigError {
            message: format!("Invalid destination '{raw}': {e}"),
        })
    }

    /// The `WTF` directory to back up.
    pub fn backup_source_dir(&self) -> Result<PathBuf> {
        if let Some(source) = &self.backup.source {
            return resolve_path(source);
        }
        let destination = self.destination_dir()?;
        // <game>/_retail_/Interface/AddOns -> <game>/_retail_/WTF
        let game_dir = destination.parent().and_then(Path::parent).ok_or_else(|| {
            anyhow::anyhow!(
                "Cannot derive the WTF directory from destination {}",
                destination.display()
            )
        })?;
        Ok(game_dir.join("WTF"))
    }

    /// Directory receiving settings backups.
    pub fn backup_dir(&self) -> Result<PathBuf> {
        match &self.backup.directory {
            Some(directory) => resolve_path(directory),
            None => Ok(config_dir()?.join("backups")),
        }
    }

    /// Location of the add-on repository file.
    pub fn repository_file(&self) -> Result<PathBuf> {
        match &self.repository_path {
            Some(path) => resolve_path(path),
            None => Ok(config_dir()?.join(crate::constants::REPOSITORY_FILE)),
        }
    }

    /// The effective concurrency limit, never below one.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }
}

/// `~/.wam` on Unix, `%LOCALAPPDATA%\wam` on Windows.
pub fn config_dir() -> Result<PathBuf> {
    let dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("wam")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".wam")
    };
    Ok(dir)
}

/// The config file path, honouring `WAM_CONFIG_PATH`.
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return resolve_path(&path);
    }
    Ok(config_dir()?.join("config.toml"))
}
