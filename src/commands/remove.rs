//! Uninstalls a tracked add-on and the folders it owns.

use super::{AddonCommand, CommandContext, CommandError, Failure, backup_folder, restore_folder};
use crate::events::{Operation, Stage};
use crate::models::AddonRecord;
use crate::utils::fs::TempDir;
use futures::future::BoxFuture;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    pub folder: String,
    /// Every folder deleted from the destination
    pub removed_folders: Vec<String>,
}

pub struct RemoveCommand {
    folder: String,
    destination: Option<PathBuf>,
    backup_dir: Option<TempDir>,
    backups: Vec<(String, PathBuf)>,
    removed: Option<AddonRecord>,
}

impl RemoveCommand {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            destination: None,
            backup_dir: None,
            backups: Vec::new(),
            removed: None,
        }
    }

    async fn remove(&mut self, ctx: &CommandContext) -> Result<RemoveReport, Failure> {
        let destination = ctx.destination()?;
        let Some(record) = ctx.repository.get(&self.folder) else {
            return Err(match ctx.repository.owner_of(&self.folder) {
                Some(owner) => CommandError::OwnedBy {
                    folder: self.folder.clone(),
                    owner: owner.folder,
                },
                None => CommandError::NotFound {
                    folder: self.folder.clone(),
                },
            }
            .into());
        };

        ctx.emit(Operation::Remove, Stage::Start, &self.folder);
        self.destination = Some(destination.clone());

        // Backups live as long as the command, undo reads them
        let backup_root = self.backup_dir.insert(TempDir::new("backup")?).path().to_path_buf();
        let folders = record.all_folders();
        for name in &folders {
            let path = destination.join(name);
            if path.exists() {
                let backup = backup_folder(&path, &backup_root).await?;
                self.backups.push((name.clone(), backup));
            }
        }

        ctx.repository.remove(&self.folder)?;
        self.removed = Some(record);
        for name in &folders {
            ctx.config.forget_addon(name).await?;
        }

        for name in &folders {
            ctx.installer.remove_folder(&destination, name).await?;
        }

        tracing::info!(target: "commands", "Removed '{}' ({} folder(s))", self.folder, folders.len());
        ctx.emit(Operation::Remove, Stage::Complete, &self.folder);
        Ok(RemoveReport {
            folder: self.folder.clone(),
            removed_folders: folders,
        })
    }
}

impl AddonCommand for RemoveCommand {
    type Output = RemoveReport;

    fn operation(&self) -> Operation {
        Operation::Remove
    }

    fn subject(&self) -> String {
        self.folder.clone()
    }

    fn execute<'a>(
        &'a mut self,
        ctx: &'a CommandContext,
    ) -> BoxFuture<'a, Result<Self::Output, Failure>> {
        Box::pin(self.remove(ctx))
    }

    fn undo<'a>(&'a mut self, ctx: &'a CommandContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(destination) = self.destination.clone() else {
                return;
            };
            for (name, backup) in self.backups.drain(..) {
                if let Err(e) = restore_folder(&backup, &destination.join(&name)).await {
                    tracing::error!(target: "commands", "Rollback could not restore '{}': {:#}", name, e);
                }
            }
            if let Some(record) = self.removed.take()
                && let Err(e) = ctx.repository.upsert(record)
            {
                tracing::error!(target: "commands", "Rollback could not re-insert '{}': {:#}", self.folder, e);
            }
            self.backup_dir = None;
        })
    }
}
