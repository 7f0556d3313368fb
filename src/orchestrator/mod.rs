//! Batch operations over many add-ons.
//!
//! The [`Orchestrator`] runs one command per folder with bounded concurrency
//! (`max_concurrency` from the settings). Every folder gets its own entry in
//! the report, so one failing add-on never hides the outcome of the others.
//!
//! Folders are deduplicated before scheduling, and a folder that already has
//! a command in flight on the same orchestrator is refused rather than queued.
//! Folders listed in `ignored` are left out of [`Orchestrator::update_all`]
//! and [`Orchestrator::check_all`].

pub mod backup;

pub use backup::{BackupOutcome, SettingsBackup};

use crate::commands::{self, CommandContext, CommandError, UpdateCommand, UpdateReport, update};
use crate::models::{AddonRecord, AddonSource};
use anyhow::Result;
use chrono::Utc;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of one add-on in an update batch.
#[derive(Debug, Clone)]
pub struct UpdateEntry {
    pub folder: String,
    pub result: Result<UpdateReport, CommandError>,
}

/// Outcome of an update batch, entries in the order the folders were given.
#[derive(Debug, Clone, Default)]
pub struct UpdateAllReport {
    /// Set when a settings backup was attempted before the batch
    pub backup: Option<Result<BackupOutcome, String>>,
    pub entries: Vec<UpdateEntry>,
}

impl UpdateAllReport {
    /// Folders whose files changed.
    #[must_use]
    pub fn updated(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.result.as_ref().is_ok_and(|r| r.updated))
            .map(|e| e.folder.as_str())
            .collect()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &CommandError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (e.folder.as_str(), err)))
            .collect()
    }
}

/// Remote status of one add-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    UpToDate {
        version: String,
    },
    UpdateAvailable {
        installed: String,
        remote: String,
    },
    Failed(CommandError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEntry {
    pub folder: String,
    pub status: CheckStatus,
}

/// Runs commands over many add-ons at once.
#[derive(Clone)]
pub struct Orchestrator {
    ctx: CommandContext,
    in_flight: Arc<DashMap<String, ()>>,
}

impl Orchestrator {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            ctx,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    #[must_use]
    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    /// Updates every tracked, non-ignored add-on.
    ///
    /// When settings backups are enabled the backup runs first; a backup
    /// failure is logged and reported but the updates still run.
    pub async fn update_all(&self, force: bool) -> UpdateAllReport {
        let backup = if self.ctx.settings().backup.enabled {
            Some(self.backup_settings(false).await.map_err(|e| {
                tracing::warn!(target: "orchestrator", "Settings backup failed: {:#}", e);
                format!("{e:#}")
            }))
        } else {
            None
        };

        let folders: Vec<String> = self.candidates().into_iter().map(|r| r.folder).collect();
        let mut report = self.update(&folders, force).await;
        report.backup = backup;
        report
    }

    /// Updates the named folders. Unknown and owned folders fail individually.
    pub async fn update(&self, folders: &[String], force: bool) -> UpdateAllReport {
        let folders = dedup(folders);
        let concurrency = self.ctx.settings().concurrency();
        tracing::info!(target: "orchestrator", "Updating {} add-ons, {} at a time", folders.len(), concurrency);

        let mut entries: Vec<(usize, UpdateEntry)> = stream::iter(folders.into_iter().enumerate())
            .map(|(index, folder)| async move {
                let result = self.update_one(&folder, force).await;
                (
                    index,
                    UpdateEntry {
                        folder,
                        result,
                    },
                )
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        entries.sort_by_key(|(index, _)| *index);

        UpdateAllReport {
            backup: None,
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
        }
    }

    async fn update_one(&self, folder: &str, force: bool) -> Result<UpdateReport, CommandError> {
        let Some(_guard) = InFlight::claim(&self.in_flight, folder) else {
            return Err(CommandError::Failed {
                message: format!("An operation on '{folder}' is already in progress"),
            });
        };
        // Missing rows still go through the command so it can name the owner.
        let record = self
            .ctx
            .repository
            .get(folder)
            .unwrap_or_else(|| AddonRecord::new(folder, Utc::now()));
        let mut command = UpdateCommand::new(record, force);
        commands::run(&mut command, &self.ctx).await
    }

    /// Asks each tracked, non-ignored add-on's source for its latest version
    /// without installing anything. `remote_version` and `last_checked` are
    /// persisted for every add-on that resolved.
    pub async fn check_all(&self) -> Vec<CheckEntry> {
        let concurrency = self.ctx.settings().concurrency();
        let candidates = self.candidates();
        tracing::info!(target: "orchestrator", "Checking {} add-ons", candidates.len());

        let mut entries: Vec<(usize, CheckEntry)> = stream::iter(candidates.into_iter().enumerate())
            .map(|(index, record)| async move {
                let status = match self.check_one(&record).await {
                    Ok(status) => status,
                    Err(error) => CheckStatus::Failed(error),
                };
                (
                    index,
                    CheckEntry {
                        folder: record.folder,
                        status,
                    },
                )
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        entries.sort_by_key(|(index, _)| *index);
        entries.into_iter().map(|(_, entry)| entry).collect()
    }

    async fn check_one(&self, record: &AddonRecord) -> Result<CheckStatus, CommandError> {
        let addon_type = record.addon_type();
        let client = self.ctx.client(addon_type)?;
        let identifier = record.source.identifier().unwrap_or_default();
        let metadata = client
            .resolve_metadata(identifier, self.ctx.settings().flavor)
            .await
            .map_err(commands::source_error(addon_type))?;
        let remote = metadata
            .version(record.source.channel())
            .ok_or_else(|| CommandError::Source {
                origin: addon_type,
                error: crate::source::ResolveError::NotFound,
            })?
            .to_string();

        self.ctx
            .repository
            .set_checked(&record.folder, Some(remote.clone()), Utc::now())
            .map_err(|e| CommandError::Failed {
                message: format!("{e:#}"),
            })?;

        let available = update::update_available(record, &remote).map_err(|message| {
            CommandError::Failed {
                message,
            }
        })?;
        tracing::debug!(target: "orchestrator", "{}: installed {}, remote {}", record.folder, record.version, remote);
        Ok(if available {
            CheckStatus::UpdateAvailable {
                installed: record.version.clone(),
                remote,
            }
        } else {
            CheckStatus::UpToDate {
                version: record.version.clone(),
            }
        })
    }

    /// Runs the configured settings backup now.
    pub async fn backup_settings(&self, force: bool) -> Result<BackupOutcome> {
        SettingsBackup::from_settings(&self.ctx.settings())?.run(force, Utc::now()).await
    }

    /// Tracked records that batch operations consider, sorted by folder.
    fn candidates(&self) -> Vec<AddonRecord> {
        let ignored = self.ctx.settings().ignored;
        self.ctx
            .repository
            .all()
            .into_iter()
            .filter(|r| !matches!(r.source, AddonSource::Manual))
            .filter(|r| {
                let skip = ignored.contains(&r.folder);
                if skip {
                    tracing::debug!(target: "orchestrator", "Skipping ignored add-on {}", r.folder);
                }
                !skip
            })
            .collect()
    }
}

/// First occurrence of each folder, in order.
fn dedup(folders: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    folders.iter().filter(|f| seen.insert(f.as_str())).cloned().collect()
}

/// Marks a folder as busy until dropped.
struct InFlight<'a> {
    map: &'a DashMap<String, ()>,
    folder: String,
}

impl<'a> InFlight<'a> {
    fn claim(map: &'a DashMap<String, ()>, folder: &str) -> Option<Self> {
        match map.entry(folder.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    map,
                    folder: folder.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.folder);
    }
}
