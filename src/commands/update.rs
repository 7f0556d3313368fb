//! Updates one tracked add-on.
//!
//! Whether an update is available is decided by an ordered list of comparison
//! rules, the first one that applies wins:
//!
//! 1. manual add-ons cannot be updated
//! 2. git add-ons compare commits by prefix, so a stored short hash matches
//!    the full remote hash it abbreviates
//! 3. everything else updates when the version strings differ
//!
//! An add-on that is already current (and not forced) is reported with
//! `updated: false` without writing anything, to the destination or to the
//! repository.
//!
//! Before a folder is overwritten it is copied into a backup directory. If any
//! later step fails, undo copies every backup back in place and restores the
//! record as it was when the command was created, along with any independent
//! records the new release folded into it.

use super::{
    AddonCommand, CommandContext, CommandError, Failure, ScanCommand, backup_folder, delete_folder,
    restore_folder, source_error,
};
use crate::events::{Operation, Stage};
use crate::git;
use crate::models::{AddonRecord, AddonSource};
use crate::source::ResolveError;
use crate::utils::fs::TempDir;
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Outcome of an update that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub folder: String,
    /// False when the add-on was already current
    pub updated: bool,
    pub previous_version: String,
    pub remote_version: String,
}

/// Whether `remote` is newer than what `record` has installed. `None` when the
/// rule does not apply to the record's source.
type Comparison = fn(&AddonRecord, &str) -> Option<Result<bool, String>>;

const COMPARISONS: &[Comparison] = &[manual_is_not_updatable, compare_commits, compare_versions];

fn manual_is_not_updatable(record: &AddonRecord, _remote: &str) -> Option<Result<bool, String>> {
    matches!(record.source, AddonSource::Manual).then(|| {
        Err(format!("'{}' is not tracked against a source and cannot be updated", record.folder))
    })
}

fn compare_commits(record: &AddonRecord, remote: &str) -> Option<Result<bool, String>> {
    let AddonSource::Git {
        commit,
        ..
    } = &record.source
    else {
        return None;
    };
    Some(Ok(!commit.as_deref().is_some_and(|local| git::hashes_match(local, remote))))
}

fn compare_versions(record: &AddonRecord, remote: &str) -> Option<Result<bool, String>> {
    Some(Ok(record.version != remote))
}

/// Applies [`COMPARISONS`] in order.
pub fn update_available(record: &AddonRecord, remote: &str) -> Result<bool, String> {
    COMPARISONS
        .iter()
        .find_map(|compare| compare(record, remote))
        .unwrap_or(Ok(true))
}

pub struct UpdateCommand {
    snapshot: AddonRecord,
    force: bool,
    destination: Option<PathBuf>,
    backup_dir: Option<TempDir>,
    /// Folder name and backup path of every folder overwritten so far
    backups: Vec<(String, PathBuf)>,
    /// Folders written that did not exist before
    created: Vec<String>,
    /// Independent records folded into the add-on's owned folders
    claimed: Vec<AddonRecord>,
    touched_repository: bool,
}

impl UpdateCommand {
    /// Updates `record`. The record is kept as the snapshot undo restores.
    #[must_use]
    pub fn new(record: AddonRecord, force: bool) -> Self {
        Self {
            snapshot: record,
            force,
            destination: None,
            backup_dir: None,
            backups: Vec::new(),
            created: Vec::new(),
            claimed: Vec::new(),
            touched_repository: false,
        }
    }

    async fn update(&mut self, ctx: &CommandContext) -> Result<UpdateReport, Failure> {
        let destination = ctx.destination()?;
        let folder = self.snapshot.folder.clone();

        if let Some(owner) = ctx.repository.owner_of(&folder) {
            return Err(CommandError::OwnedBy {
                folder,
                owner: owner.folder,
            }
            .into());
        }
        if !ctx.repository.contains(&folder) {
            return Err(CommandError::NotFound {
                folder,
            }
            .into());
        }
        if let Some(Err(message)) = manual_is_not_updatable(&self.snapshot, "") {
            return Err(CommandError::Failed {
                message,
            }
            .into());
        }

        let addon_type = self.snapshot.addon_type();
        let client = ctx.client(addon_type)?;
        let identifier = self.snapshot.source.identifier().unwrap_or_default().to_string();
        let channel = self.snapshot.source.channel();

        ctx.emit(Operation::Update, Stage::Start, &folder);
        let metadata = client
            .resolve_metadata(&identifier, ctx.settings().flavor)
            .await
            .map_err(source_error(addon_type))?;
        let not_found = CommandError::Source {
            origin: addon_type,
            error: ResolveError::NotFound,
        };
        let remote = metadata.version(channel).ok_or_else(|| not_found.clone())?.to_string();

        let available = update_available(&self.snapshot, &remote).map_err(|message| {
            CommandError::Failed {
                message,
            }
        })?;
        if !available && !self.force {
            tracing::info!(target: "commands", "'{}' is up to date ({})", folder, self.snapshot.version);
            ctx.emit(Operation::Update, Stage::Complete, &folder);
            return Ok(UpdateReport {
                folder,
                updated: false,
                previous_version: self.snapshot.version.clone(),
                remote_version: remote,
            });
        }

        let artifact = client.artifact_location(&metadata, channel).ok_or(not_found)?;
        ctx.emit(Operation::Update, Stage::Downloading, &folder);
        let mut staging = ctx.installer.fetch(&artifact).await?;
        ctx.emit(Operation::Update, Stage::Extracting, &folder);
        staging.extract().await?;
        let folders = staging.discover(&identifier)?;

        self.destination = Some(destination.clone());
        let backup_root = self.backup_dir.insert(TempDir::new("backup")?).path().to_path_buf();
        for staged in &folders {
            let target = destination.join(&staged.name);
            if target.exists() {
                let backup = backup_folder(&target, &backup_root).await?;
                self.backups.push((staged.name.clone(), backup));
            }
        }

        ctx.emit(Operation::Update, Stage::Copying, &folder);
        for staged in &folders {
            if !self.backups.iter().any(|(name, _)| *name == staged.name) {
                self.created.push(staged.name.clone());
            }
            ctx.installer.copy_folder(staged, &destination).await?;
        }

        // New folders shipped by the release join the owned set
        let mut owned: BTreeSet<String> = self.snapshot.owned_folders.clone();
        owned.extend(folders.iter().map(|f| f.name.clone()).filter(|name| *name != folder));

        self.touched_repository = true;
        ctx.repository.update(&folder, |record| record.owned_folders.clone_from(&owned))?;
        self.claimed = ctx.repository.claim_owned_folders(&folder, &owned)?;
        ScanCommand::restricted_to([folder.clone()]).scan(ctx).await?;

        let now = Utc::now();
        ctx.repository.update(&folder, |record| {
            record.version.clone_from(&remote);
            record.remote_version = Some(remote.clone());
            if let AddonSource::Git {
                commit,
                ..
            } = &mut record.source
            {
                *commit = Some(remote.clone());
            }
            record.last_updated = now;
            record.last_checked = Some(now);
        })?;

        tracing::info!(target: "commands", "Updated '{}' {} -> {}", folder, self.snapshot.version, remote);
        ctx.emit(Operation::Update, Stage::Complete, &folder);
        Ok(UpdateReport {
            folder,
            updated: true,
            previous_version: self.snapshot.version.clone(),
            remote_version: remote,
        })
    }
}

impl AddonCommand for UpdateCommand {
    type Output = UpdateReport;

    fn operation(&self) -> Operation {
        Operation::Update
    }

    fn subject(&self) -> String {
        self.snapshot.folder.clone()
    }

    fn execute<'a>(
        &'a mut self,
        ctx: &'a CommandContext,
    ) -> BoxFuture<'a, Result<Self::Output, Failure>> {
        Box::pin(self.update(ctx))
    }

    fn undo<'a>(&'a mut self, ctx: &'a CommandContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(destination) = self.destination.clone() else {
                return;
            };

            for (name, backup) in self.backups.drain(..) {
                match restore_folder(&backup, &destination.join(&name)).await {
                    Ok(()) => tracing::info!(target: "commands", "Restored '{}' from backup", name),
                    Err(e) => tracing::error!(target: "commands", "Rollback could not restore '{}': {:#}", name, e),
                }
            }
            for name in self.created.drain(..) {
                if let Err(e) = delete_folder(&destination.join(&name)).await {
                    tracing::error!(target: "commands", "Rollback could not delete '{}': {:#}", name, e);
                }
            }
            if self.touched_repository
                && let Err(e) = ctx.repository.upsert(self.snapshot.clone())
            {
                tracing::error!(target: "commands", "Rollback could not restore record '{}': {:#}", self.snapshot.folder, e);
            }
            for record in self.claimed.drain(..) {
                let folder = record.folder.clone();
                if let Err(e) = ctx.repository.upsert(record) {
                    tracing::error!(target: "commands", "Rollback could not restore record '{}': {:#}", folder, e);
                }
            }
            self.backup_dir = None;
        })
    }
}
