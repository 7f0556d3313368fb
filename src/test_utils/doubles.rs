//! Test doubles for the seams commands depend on.

use crate::events::{AddonEvent, EventSink};
use crate::installer::{FolderCopier, ReplaceCopier};
use crate::models::{AddonSource, AddonType, Channel, Flavor};
use crate::source::{Artifact, Release, RemoteMetadata, ResolveError, SourceClient};
use anyhow::{Result, bail};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AddonEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<AddonEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event names in emission order, e.g. `install:start`.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events().iter().map(AddonEvent::name).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AddonEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// A source client answering from a table of canned metadata.
///
/// Unknown identifiers resolve to [`ResolveError::NotFound`]. Git clients hand
/// out [`Artifact::Clone`], all others [`Artifact::Archive`].
pub struct FixtureClient {
    addon_type: AddonType,
    entries: Mutex<HashMap<String, Result<RemoteMetadata, ResolveError>>>,
    calls: AtomicUsize,
}

impl FixtureClient {
    #[must_use]
    pub fn new(addon_type: AddonType) -> Self {
        Self {
            addon_type,
            entries: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answers `identifier` with `metadata` from now on.
    pub fn set(&self, identifier: &str, metadata: RemoteMetadata) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(identifier.to_string(), Ok(metadata));
        }
    }

    /// Answers `identifier` with `error` from now on.
    pub fn set_error(&self, identifier: &str, error: ResolveError) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(identifier.to_string(), Err(error));
        }
    }

    /// Number of `resolve_metadata` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceClient for FixtureClient {
    fn addon_type(&self) -> AddonType {
        self.addon_type
    }

    fn resolve_metadata<'a>(
        &'a self,
        identifier: &'a str,
        _flavor: Flavor,
    ) -> BoxFuture<'a, Result<RemoteMetadata, ResolveError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(identifier).cloned())
            .unwrap_or(Err(ResolveError::NotFound));
        Box::pin(async move { answer })
    }

    fn artifact_location(
        &self,
        metadata: &RemoteMetadata,
        channel: Option<Channel>,
    ) -> Option<Artifact> {
        let url = metadata.release(channel)?.download_url.clone();
        Some(match self.addon_type {
            AddonType::Git => Artifact::Clone {
                url,
            },
            _ => Artifact::Archive {
                url,
            },
        })
    }
}

/// Metadata with a single stable release served from a local archive.
#[must_use]
pub fn archive_metadata(
    source: AddonSource,
    target_name: &str,
    version: &str,
    archive: &Path,
) -> RemoteMetadata {
    RemoteMetadata {
        name: target_name.to_string(),
        target_name: target_name.to_string(),
        secondary_name: None,
        author: "Fixture".to_string(),
        source,
        declared_folders: Vec::new(),
        releases: vec![Release {
            channel: Channel::Stable,
            version: version.to_string(),
            download_url: format!("file://{}", archive.display()),
        }],
    }
}

/// Replaces folders like [`ReplaceCopier`] but fails half way through the
/// folder named `fail_on`, leaving a partial copy behind. Deleting that folder
/// fails half way too, after its first entry is gone.
pub struct FailingCopier {
    fail_on: String,
    attempts: AtomicUsize,
}

impl FailingCopier {
    pub fn new(fail_on: impl Into<String>) -> Self {
        Self {
            fail_on: fail_on.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of folders the copier was asked to write.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl FolderCopier for FailingCopier {
    fn copy_folder(&self, staged: &Path, target: &Path) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if target.file_name().is_some_and(|n| n == self.fail_on.as_str()) {
            crate::utils::fs::remove_dir_all(target)?;
            std::fs::create_dir_all(target)?;
            std::fs::write(target.join("partial.lua"), "-- interrupted")?;
            bail!("simulated copy failure for {}", self.fail_on);
        }
        ReplaceCopier.copy_folder(staged, target)
    }

    fn remove_folder(&self, target: &Path) -> Result<()> {
        if target.file_name().is_some_and(|n| n == self.fail_on.as_str()) {
            let mut entries: Vec<_> =
                std::fs::read_dir(target)?.filter_map(|e| e.ok().map(|e| e.path())).collect();
            entries.sort();
            if let Some(first) = entries.first() {
                crate::utils::fs::remove_dir_all(first)?;
            }
            bail!("simulated delete failure for {}", self.fail_on);
        }
        ReplaceCopier.remove_folder(target)
    }
}
