//! Shared data models for WAM operations
//!
//! This module defines the persisted add-on record and the small closed enums it
//! is built from. Every command, the repository and the source clients speak in
//! these types.
//!
//! # Record shape
//!
//! An [`AddonRecord`] carries fields common to all add-ons (folder, name, version,
//! ownership bookkeeping, timestamps) plus an [`AddonSource`] describing where the
//! add-on came from. `AddonSource` is a closed sum type with one variant per
//! origin, so a WoWInterface add-on can never carry a commit hash and a git
//! add-on can never carry a catalog id.
//!
//! ```rust
//! use wam_cli::models::{AddonRecord, AddonSource, AddonType};
//!
//! let mut record = AddonRecord::new("ElvUI", chrono::Utc::now());
//! record.source = AddonSource::Tukui {
//!     slug: "elvui".to_string(),
//!     url: "https://tukui.org/elvui".to_string(),
//! };
//! record.set_owned_folders(["ElvUI_Options", "ElvUI", "ElvUI_Libraries"]);
//!
//! assert_eq!(record.addon_type(), AddonType::Tukui);
//! // a record never owns its own folder
//! assert_eq!(record.owned_folders.len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The origin an add-on is tracked against.
///
/// Derived from [`AddonSource`]; used as a key for source client lookup and for
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonType {
    /// A git repository cloned from a version-control host
    Git,
    /// The WoWInterface download API
    #[serde(rename = "wowinterface")]
    WowInterface,
    /// The Tukui download API
    Tukui,
    /// The Wago REST catalog
    Wago,
    /// Discovered on disk without any source information
    Manual,
}

impl AddonType {
    /// Returns the lowercase identifier used in files, events and the CLI.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::WowInterface => "wowinterface",
            Self::Tukui => "tukui",
            Self::Wago => "wago",
            Self::Manual => "manual",
        }
    }

    /// Whether the add-on is tracked against a remote source.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for AddonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddonType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "git" | "github" => Ok(Self::Git),
            "wowinterface" | "wowi" => Ok(Self::WowInterface),
            "tukui" => Ok(Self::Tukui),
            "wago" => Ok(Self::Wago),
            "manual" => Ok(Self::Manual),
            other => Err(anyhow::anyhow!("Unknown add-on type: {other}")),
        }
    }
}

/// A release track on a channel-aware catalog.
///
/// Ordered by stability: `Alpha < Beta < Stable`. A request for a channel accepts
/// every release that is at least as stable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Bleeding edge builds
    Alpha,
    /// Pre-release builds
    Beta,
    /// Regular releases
    #[default]
    Stable,
}

impl Channel {
    /// Whether a release published on `self` satisfies a request for `requested`.
    #[must_use]
    pub fn satisfies(self, requested: Self) -> bool {
        self >= requested
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Stable => "stable",
        })
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "stable" | "release" => Ok(Self::Stable),
            other => Err(anyhow::anyhow!("Unknown release channel: {other}")),
        }
    }
}

/// The game variant an add-on targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    /// The current expansion
    #[default]
    Retail,
    /// Progression classic servers
    Classic,
    /// Original classic servers
    ClassicEra,
}

impl Flavor {
    /// The `game_version` value used by catalog APIs.
    #[must_use]
    pub const fn game_version(&self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Classic => "classic",
            Self::ClassicEra => "classic_era",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retail => "retail",
            Self::Classic => "classic",
            Self::ClassicEra => "classic-era",
        })
    }
}

/// Whether a folder is a regular add-on or a shared library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonKind {
    /// A user-facing add-on
    #[default]
    Addon,
    /// A library loaded by other add-ons
    Library,
}

/// Where an add-on came from, with the fields meaningful to that origin only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AddonSource {
    /// Cloned from a git repository
    Git {
        /// Clone URL
        url: String,
        /// Commit hash of the installed tree, short or full
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commit: Option<String>,
    },
    /// Downloaded from WoWInterface
    #[serde(rename = "wowinterface")]
    WowInterface {
        /// Numeric file id
        id: String,
        /// Download page URL
        url: String,
    },
    /// Downloaded from Tukui
    Tukui {
        /// Add-on slug (e.g. `elvui`)
        slug: String,
        /// Add-on page URL
        url: String,
    },
    /// Downloaded from Wago
    Wago {
        /// Catalog id
        id: String,
        /// Add-on page URL
        url: String,
        /// Release channel the add-on follows
        #[serde(default)]
        channel: Channel,
    },
    /// Found on disk, not tracked against any source
    #[default]
    Manual,
}

impl AddonSource {
    /// Returns the [`AddonType`] of this source.
    #[must_use]
    pub const fn addon_type(&self) -> AddonType {
        match self {
            Self::Git {
                ..
            } => AddonType::Git,
            Self::WowInterface {
                ..
            } => AddonType::WowInterface,
            Self::Tukui {
                ..
            } => AddonType::Tukui,
            Self::Wago {
                ..
            } => AddonType::Wago,
            Self::Manual => AddonType::Manual,
        }
    }

    /// The identifier a source client resolves metadata from.
    ///
    /// For git this is the clone URL, for catalogs the catalog id or slug.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Git {
                url,
                ..
            } => Some(url),
            Self::WowInterface {
                id,
                ..
            }
            | Self::Wago {
                id,
                ..
            } => Some(id),
            Self::Tukui {
                slug,
                ..
            } => Some(slug),
            Self::Manual => None,
        }
    }

    /// The user-facing URL of the add-on, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Git {
                url,
                ..
            }
            | Self::WowInterface {
                url,
                ..
            }
            | Self::Tukui {
                url,
                ..
            }
            | Self::Wago {
                url,
                ..
            } => Some(url),
            Self::Manual => None,
        }
    }

    /// The commit hash, for git sources only.
    #[must_use]
    pub fn commit_hash(&self) -> Option<&str> {
        match self {
            Self::Git {
                commit,
                ..
            } => commit.as_deref(),
            _ => None,
        }
    }

    /// The release channel, for channel-aware sources only.
    #[must_use]
    pub const fn channel(&self) -> Option<Channel> {
        match self {
            Self::Wago {
                channel,
                ..
            } => Some(*channel),
            _ => None,
        }
    }
}

/// One independently tracked add-on.
///
/// Keyed by [`folder`](Self::folder), the on-disk directory name inside the
/// destination. Folders installed alongside it by the same release are listed in
/// [`owned_folders`](Self::owned_folders) and are never tracked on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonRecord {
    /// Directory name inside the destination; unique across the repository
    pub folder: String,

    /// Display name from the manifest or source metadata
    pub name: String,

    /// Where the add-on came from
    #[serde(default)]
    pub source: AddonSource,

    /// Installed version string
    #[serde(default)]
    pub version: String,

    /// Author as reported by the manifest or source
    #[serde(default)]
    pub author: String,

    /// `## Interface:` value of the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_version: Option<String>,

    /// Version last reported by the remote, if checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_version: Option<String>,

    /// Folders this record is responsible for; never contains `folder`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub owned_folders: BTreeSet<String>,

    /// Add-on or library
    #[serde(default)]
    pub kind: AddonKind,

    /// True once a manual classification wins over auto-detection
    #[serde(default)]
    pub kind_override: bool,

    /// Game variant
    #[serde(default)]
    pub flavor: Flavor,

    /// Required dependencies declared by the manifest
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_deps: BTreeSet<String>,

    /// Optional dependencies declared by the manifest
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub optional_deps: BTreeSet<String>,

    /// Libraries bundled inside the add-on folder
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub embedded_libs: BTreeSet<String>,

    /// When the add-on was first recorded
    pub install_date: DateTime<Utc>,

    /// When the add-on files last changed through WAM
    pub last_updated: DateTime<Utc>,

    /// When the remote was last asked for a newer version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl AddonRecord {
    /// Creates a manual record for `folder` with every optional field empty.
    pub fn new(folder: impl Into<String>, now: DateTime<Utc>) -> Self {
        let folder = folder.into();
        Self {
            name: folder.clone(),
            folder,
            source: AddonSource::Manual,
            version: String::new(),
            author: String::new(),
            interface_version: None,
            remote_version: None,
            owned_folders: BTreeSet::new(),
            kind: AddonKind::Addon,
            kind_override: false,
            flavor: Flavor::default(),
            required_deps: BTreeSet::new(),
            optional_deps: BTreeSet::new(),
            embedded_libs: BTreeSet::new(),
            install_date: now,
            last_updated: now,
            last_checked: None,
        }
    }

    /// Returns the [`AddonType`] derived from the source.
    #[must_use]
    pub const fn addon_type(&self) -> AddonType {
        self.source.addon_type()
    }

    /// Replaces the owned folder set, dropping the record's own folder.
    pub fn set_owned_folders<I, S>(&mut self, folders: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owned_folders =
            folders.into_iter().map(Into::into).filter(|f| f != &self.folder).collect();
    }

    /// Whether `folder` is one of the folders owned by this record.
    #[must_use]
    pub fn owns(&self, folder: &str) -> bool {
        self.owned_folders.contains(folder)
    }

    /// The record's folder followed by every owned folder.
    #[must_use]
    pub fn all_folders(&self) -> Vec<String> {
        std::iter::once(self.folder.clone()).chain(self.owned_folders.iter().cloned()).collect()
    }

    /// Enforces the record-local invariants before the record is persisted.
    pub(crate) fn normalize(&mut self) {
        let folder = self.folder.clone();
        self.owned_folders.remove(&folder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ordering() {
        assert!(Channel::Stable > Channel::Beta);
        assert!(Channel::Beta > Channel::Alpha);
        assert!(Channel::Stable.satisfies(Channel::Beta));
        assert!(Channel::Beta.satisfies(Channel::Beta));
        assert!(!Channel::Alpha.satisfies(Channel::Beta));
    }

    #[test]
    fn test_addon_type_from_str() {
        assert_eq!("GitHub".parse::<AddonType>().unwrap(), AddonType::Git);
        assert_eq!("wowi".parse::<AddonType>().unwrap(), AddonType::WowInterface);
        assert!("curse".parse::<AddonType>().is_err());
    }

    #[test]
    fn test_source_accessors() {
        let source = AddonSource::Git {
            url: "https://github.com/user/RepoAddon".to_string(),
            commit: Some("abc1234".to_string()),
        };
        assert_eq!(source.addon_type(), AddonType::Git);
        assert_eq!(source.commit_hash(), Some("abc1234"));
        assert_eq!(source.identifier(), Some("https://github.com/user/RepoAddon"));
        assert_eq!(source.channel(), None);

        let source = AddonSource::Wago {
            id: "abc".to_string(),
            url: "https://addons.wago.io/addons/abc".to_string(),
            channel: Channel::Beta,
        };
        assert_eq!(source.commit_hash(), None);
        assert_eq!(source.channel(), Some(Channel::Beta));
        assert_eq!(AddonSource::Manual.url(), None);
    }

    #[test]
    fn test_owned_folders_never_contain_own_folder() {
        let mut record = AddonRecord::new("DBM-Core", Utc::now());
        record.set_owned_folders(["DBM-Core", "DBM-StatusBarTimers", "DBM-GUI"]);
        assert!(!record.owns("DBM-Core"));
        assert_eq!(record.all_folders(), vec!["DBM-Core", "DBM-GUI", "DBM-StatusBarTimers"]);

        record.owned_folders.insert("DBM-Core".to_string());
        record.normalize();
        assert!(!record.owns("DBM-Core"));
    }

    #[test]
    fn test_record_toml_shape() {
        let mut record = AddonRecord::new("Bagnon", Utc::now());
        record.source = AddonSource::WowInterface {
            id: "4459".to_string(),
            url: "https://www.wowinterface.com/downloads/info4459".to_string(),
        };
        let text = toml::to_string(&record).unwrap();
        assert!(text.contains("type = \"wowinterface\""));

        let back: AddonRecord = toml::from_str(&text).unwrap();
        assert_eq!(back.source, record.source);
    }
}
