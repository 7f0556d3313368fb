//! Source clients: where add-ons come from.
//!
//! Every origin WAM installs from has a [`SourceClient`]. A client turns an
//! identifier (clone URL, catalog id or slug) into [`RemoteMetadata`], and
//! metadata plus an optional [`Channel`] into an [`Artifact`] the installer can
//! fetch.
//!
//! | Origin | Client | Identifier | Artifact |
//! |--------|--------|------------|----------|
//! | git host | [`GitClient`] | clone URL | [`Artifact::Clone`] |
//! | WoWInterface | [`WowInterfaceClient`] | numeric file id | [`Artifact::Archive`] |
//! | Tukui | [`TukuiClient`] | slug | [`Artifact::Archive`] |
//! | Wago | [`WagoClient`] | catalog id | [`Artifact::Archive`] |
//!
//! Expected outcomes such as "no such add-on" or "API key rejected" are returned
//! as a [`ResolveError`] so callers can branch on them. Clients never panic on a
//! malformed payload.
//!
//! Commands look clients up in a [`SourceRegistry`]. Tests register fixture
//! clients in place of the network-backed ones.

pub mod git;
pub mod http;
pub mod tukui;
pub mod wago;
pub mod wowinterface;

pub use git::GitClient;
pub use http::HttpClient;
pub use tukui::TukuiClient;
pub use wago::WagoClient;
pub use wowinterface::WowInterfaceClient;

use crate::config::Settings;
use crate::core::WamError;
use crate::models::{AddonSource, AddonType, Channel, Flavor};
use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Why a source could not produce metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("add-on not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing or rejected API key")]
    NoApiKey,
}

/// One downloadable release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub channel: Channel,
    /// Version string, or the commit hash for git
    pub version: String,
    pub download_url: String,
}

/// What a source knows about an add-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Display name
    pub name: String,
    /// Folder name the release is expected to install as
    pub target_name: String,
    /// Additional display name some catalogs provide
    pub secondary_name: Option<String>,
    pub author: String,
    /// Source record to persist for the add-on
    pub source: AddonSource,
    /// Folders the source declares explicitly; the first one is the parent
    pub declared_folders: Vec<String>,
    /// Available releases, newest first
    pub releases: Vec<Release>,
}

impl RemoteMetadata {
    /// The newest release at least as stable as `channel` (stable by default).
    #[must_use]
    pub fn release(&self, channel: Option<Channel>) -> Option<&Release> {
        let requested = channel.unwrap_or_default();
        self.releases.iter().find(|r| r.channel.satisfies(requested))
    }

    /// Version string of [`release`](Self::release).
    #[must_use]
    pub fn version(&self, channel: Option<Channel>) -> Option<&str> {
        self.release(channel).map(|r| r.version.as_str())
    }
}

/// Where to fetch an add-on from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A repository to clone
    Clone { url: String },
    /// An archive to download and extract
    Archive { url: String },
}

/// A client for one add-on origin.
pub trait SourceClient: Send + Sync {
    fn addon_type(&self) -> AddonType;

    fn resolve_metadata<'a>(
        &'a self,
        identifier: &'a str,
        flavor: Flavor,
    ) -> BoxFuture<'a, Result<RemoteMetadata, ResolveError>>;

    /// The artifact for the release matching `channel`.
    fn artifact_location(
        &self,
        metadata: &RemoteMetadata,
        channel: Option<Channel>,
    ) -> Option<Artifact> {
        metadata.release(channel).map(|r| Artifact::Archive {
            url: r.download_url.clone(),
        })
    }
}

/// Source clients keyed by [`AddonType`].
#[derive(Clone, Default)]
pub struct SourceRegistry {
    clients: HashMap<AddonType, Arc<dyn SourceClient>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four network-backed clients configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = HttpClient::new()?;
        let mut registry = Self::new();
        registry.register(Arc::new(GitClient::new()));
        registry.register(Arc::new(WowInterfaceClient::new(
            http.clone(),
            &settings.endpoints.wowinterface,
        )));
        registry.register(Arc::new(TukuiClient::new(http.clone(), &settings.endpoints.tukui)));
        registry.register(Arc::new(WagoClient::new(
            http,
            &settings.endpoints.wago,
            settings.api_keys.wago.clone(),
        )));
        Ok(registry)
    }

    /// Adds or replaces the client for its [`AddonType`].
    pub fn register(&mut self, client: Arc<dyn SourceClient>) {
        self.clients.insert(client.addon_type(), client);
    }

    #[must_use]
    pub fn get(&self, addon_type: AddonType) -> Option<Arc<dyn SourceClient>> {
        self.clients.get(&addon_type).cloned()
    }
}

/// An install request classified by origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSource {
    pub addon_type: AddonType,
    pub identifier: String,
}

/// Classifies a user supplied URL.
///
/// Recognises WoWInterface download pages, Tukui pages, Wago add-on pages and
/// git repositories. Anything else is [`WamError::UnsupportedSource`].
pub fn parse_source(input: &str) -> Result<ParsedSource, WamError> {
    let input = input.trim();
    let unsupported = || WamError::UnsupportedSource {
        input: input.to_string(),
    };

    let lower = input.to_ascii_lowercase();
    let without_scheme = lower.split_once("://").map_or(lower.as_str(), |(_, rest)| rest);
    let host = without_scheme.split(['/', '?']).next().unwrap_or("");
    let host = host.strip_prefix("www.").unwrap_or(host);

    let parsed = |addon_type, identifier: String| ParsedSource {
        addon_type,
        identifier,
    };

    if host.ends_with("wowinterface.com") {
        return wowinterface::id_from_url(input)
            .map(|id| parsed(AddonType::WowInterface, id))
            .ok_or_else(unsupported);
    }
    if host.ends_with("tukui.org") {
        return tukui::slug_from_url(input)
            .map(|slug| parsed(AddonType::Tukui, slug))
            .ok_or_else(unsupported);
    }
    if host.ends_with("wago.io") {
        return wago::id_from_url(input)
            .map(|id| parsed(AddonType::Wago, id))
            .ok_or_else(unsupported);
    }
    if is_git_url(&lower, host) {
        return Ok(parsed(AddonType::Git, input.trim_end_matches('/').to_string()));
    }

    Err(unsupported())
}

fn is_git_url(lower: &str, host: &str) -> bool {
    const GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

    lower.starts_with("git@")
        || lower.starts_with("file://")
        || lower.ends_with(".git")
        || (GIT_HOSTS.contains(&host)
            && (lower.starts_with("https://") || lower.starts_with("http://")))
}

/// Reads a string field, accepting numbers as well.
pub(crate) fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
