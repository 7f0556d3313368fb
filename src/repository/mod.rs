//! Persisted store of add-on records.
//!
//! [`AddonRepository`] owns the table of [`AddonRecord`]s keyed by folder. It is
//! shared between concurrently running commands as an `Arc`, so the in-memory
//! table sits behind a mutex and every mutation is written to disk before the
//! mutex is released. A reader therefore never observes a state that is not
//! also on disk.
//!
//! Two invariants are enforced here rather than by callers:
//!
//! - folders are unique; [`insert`](AddonRepository::insert) refuses a second
//!   record for the same folder
//! - a folder owned by one record is never tracked on its own; see
//!   [`claim_owned_folders`](AddonRepository::claim_owned_folders)
//!
//! A [`StoreLock`] is held for the lifetime of the repository so a second
//! process cannot interleave its writes.

pub mod io;
pub mod lock;


pub use lock::StoreLock;

use crate::core::WamError;
use crate::models::{AddonRecord, AddonType};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub struct AddonRepository {
    path: PathBuf,
    table: Mutex<BTreeMap<String, AddonRecord>>,
    _lock: StoreLock,
}

impl std::fmt::Debug for AddonRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonRepository").field("path", &self.path).finish_non_exhaustive()
    }
}

impl AddonRepository {
    /// Locks and loads the store at `path`, creating it lazily on first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock = StoreLock::acquire(&path).await?;

        let load_path = path.clone();
        let table = tokio::task::spawn_blocking(move || io::load(&load_path))
            .await
            .map_err(|e| anyhow!("Store load task panicked: {e}"))??;
        tracing::debug!(target: "repository", "Loaded {} add-on(s) from {}", table.len(), path.display());

        Ok(Self {
            path,
            table: Mutex::new(table),
            _lock: lock,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(&self) -> Result<MutexGuard<'_, BTreeMap<String, AddonRecord>>> {
        self.table.lock().map_err(|_| anyhow!("Add-on store lock poisoned"))
    }

    /// Applies `change` to the table and persists it while still holding the
    /// mutex. The in-memory table is left untouched if the write fails.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, AddonRecord>) -> Result<T>,
    ) -> Result<T> {
        let mut table = self.table()?;
        let mut next = table.clone();
        let out = change(&mut next)?;
        if next != *table {
            io::save(&self.path, &next)?;
            *table = next;
        }
        Ok(out)
    }

    #[must_use]
    pub fn get(&self, folder: &str) -> Option<AddonRecord> {
        self.table().ok()?.get(folder).cloned()
    }

    #[must_use]
    pub fn contains(&self, folder: &str) -> bool {
        self.table().is_ok_and(|t| t.contains_key(folder))
    }

    /// Every record, sorted by folder.
    #[must_use]
    pub fn all(&self) -> Vec<AddonRecord> {
        self.table().map(|t| t.values().cloned().collect()).unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table().map(|t| t.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a new record. Fails with [`WamError::DuplicateAddon`] if the
    /// folder is already tracked.
    pub fn insert(&self, mut record: AddonRecord) -> Result<()> {
        record.normalize();
        self.mutate(|table| {
            if table.contains_key(&record.folder) {
                return Err(WamError::DuplicateAddon {
                    folder: record.folder.clone(),
                }
                .into());
            }
            tracing::debug!(target: "repository", "Inserting '{}'", record.folder);
            table.insert(record.folder.clone(), record);
            Ok(())
        })
    }

    /// Inserts or replaces the record for its folder.
    pub fn upsert(&self, mut record: AddonRecord) -> Result<()> {
        record.normalize();
        self.mutate(|table| {
            table.insert(record.folder.clone(), record);
            Ok(())
        })
    }

    /// Applies `change` to an existing record and returns the result.
    pub fn update(&self, folder: &str, change: impl FnOnce(&mut AddonRecord)) -> Result<AddonRecord> {
        self.mutate(|table| {
            let record = table.get_mut(folder).ok_or_else(|| WamError::AddonNotFound {
                folder: folder.to_string(),
            })?;
            change(record);
            record.normalize();
            Ok(record.clone())
        })
    }

    /// Deletes the record for `folder`, returning it if there was one.
    pub fn remove(&self, folder: &str) -> Result<Option<AddonRecord>> {
        self.mutate(|table| Ok(table.remove(folder)))
    }

    /// The record that lists `folder` among its owned folders.
    #[must_use]
    pub fn owner_of(&self, folder: &str) -> Option<AddonRecord> {
        self.table().ok()?.values().find(|r| r.owns(folder)).cloned()
    }

    /// Deletes the independent rows of every folder in `owned` except
    /// `parent`, returning the deleted records.
    pub fn claim_owned_folders(
        &self,
        parent: &str,
        owned: &BTreeSet<String>,
    ) -> Result<Vec<AddonRecord>> {
        self.mutate(|table| {
            let mut removed = Vec::new();
            for folder in owned.iter().filter(|f| f.as_str() != parent) {
                if let Some(record) = table.remove(folder) {
                    tracing::debug!(target: "repository", "'{}' is now owned by '{}'", folder, parent);
                    removed.push(record);
                }
            }
            Ok(removed)
        })
    }

    /// The record tracking `identifier` on the given source.
    #[must_use]
    pub fn find_by_source(&self, addon_type: AddonType, identifier: &str) -> Option<AddonRecord> {
        self.table()
            .ok()?
            .values()
            .find(|r| {
                r.addon_type() == addon_type
                    && r.source.identifier().is_some_and(|id| id.eq_ignore_ascii_case(identifier))
            })
            .cloned()
    }

    /// Records the outcome of a remote check.
    pub fn set_checked(
        &self,
        folder: &str,
        remote_version: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AddonRecord> {
        self.update(folder, |record| {
            if remote_version.is_some() {
                record.remote_version = remote_version;
            }
            record.last_checked = Some(at);
        })
    }
}
