//! Install, update, remove and scan.
//!
//! Each operation is a command object implementing [`AddonCommand`]. A command
//! records what it changed while it runs so that [`AddonCommand::undo`] can
//! revert exactly that. Callers never call `execute` directly; they go through
//! [`run`], which
//!
//! - runs `undo` whenever `execute` fails, logging but never propagating undo
//!   failures
//! - converts raised errors into [`CommandError::Failed`] with the full context
//!   chain
//! - emits an `error` event naming the failed operation
//!
//! Expected refusals (destination not configured, source says "not found",
//! folder owned by another add-on) are [`Failure::Rejected`] and reach the
//! caller unchanged. Everything else is [`Failure::Raised`].
//!
//! # Example
//!
//! ```rust,no_run
//! use wam_cli::commands::{self, CommandContext, InstallCommand};
//!
//! # async fn example(ctx: CommandContext) -> anyhow::Result<()> {
//! let mut install = InstallCommand::from_url("https://github.com/user/RepoAddon");
//! match commands::run(&mut install, &ctx).await {
//!     Ok(report) => println!("installed {:?}", report.installed_addons),
//!     Err(e) => eprintln!("install failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod install;
pub mod remove;
pub mod scan;
pub mod update;

#[cfg(test)]
mod tests;

pub use install::{InstallCommand, InstallReport};
pub use remove::{RemoveCommand, RemoveReport};
pub use scan::{ScanCommand, ScanReport};
pub use update::{UpdateCommand, UpdateReport};

use crate::config::{ConfigStore, Settings};
use crate::events::{AddonEvent, EventSink, NoopSink, Operation, Stage};
use crate::installer::Installer;
use crate::models::AddonType;
use crate::repository::AddonRepository;
use crate::source::{ResolveError, SourceClient, SourceRegistry};
use crate::utils::fs::{copy_dir, remove_dir_all, restore_dir};
use anyhow::Context;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Everything a command needs, shared between concurrently running commands.
#[derive(Clone)]
pub struct CommandContext {
    pub repository: Arc<AddonRepository>,
    pub sources: SourceRegistry,
    pub config: Arc<dyn ConfigStore>,
    pub installer: Installer,
    pub events: Arc<dyn EventSink>,
}

impl CommandContext {
    /// A context that emits events nowhere.
    pub fn new(
        repository: Arc<AddonRepository>,
        sources: SourceRegistry,
        config: Arc<dyn ConfigStore>,
        installer: Installer,
    ) -> Self {
        Self {
            repository,
            sources,
            config,
            installer,
            events: Arc::new(NoopSink),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.config.get()
    }

    /// The configured destination, or [`CommandError::NotConfigured`].
    pub fn destination(&self) -> Result<PathBuf, CommandError> {
        self.settings().destination_dir().map_err(|e| match e {
            crate::core::WamError::NotConfigured => CommandError::NotConfigured,
            other => CommandError::Failed {
                message: other.to_string(),
            },
        })
    }

    pub(crate) fn client(&self, addon_type: AddonType) -> Result<Arc<dyn SourceClient>, CommandError> {
        self.sources.get(addon_type).ok_or_else(|| CommandError::Failed {
            message: format!("No source client registered for {addon_type}"),
        })
    }

    pub(crate) fn emit(&self, operation: Operation, stage: Stage, subject: &str) {
        self.events.emit(&AddonEvent::progress(operation, stage, subject));
    }
}

/// Result of a command that did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("The add-on destination folder is not configured")]
    NotConfigured,

    #[error("{origin}: {error}")]
    Source {
        origin: AddonType,
        error: ResolveError,
    },

    #[error("'{folder}' is owned by '{owner}'; update '{owner}' instead")]
    OwnedBy {
        folder: String,
        owner: String,
    },

    #[error("Add-on '{folder}' is not tracked")]
    NotFound {
        folder: String,
    },

    #[error("{message}")]
    Failed {
        message: String,
    },
}

/// How `execute` stopped.
#[derive(Debug)]
pub enum Failure {
    /// An expected refusal, passed to the caller as is
    Rejected(CommandError),
    /// An unexpected fault, reported as [`CommandError::Failed`]
    Raised(anyhow::Error),
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Self::Raised(error)
    }
}

impl From<CommandError> for Failure {
    fn from(error: CommandError) -> Self {
        Self::Rejected(error)
    }
}

impl From<crate::core::WamError> for Failure {
    fn from(error: crate::core::WamError) -> Self {
        Self::Raised(error.into())
    }
}

/// A unit of work on the destination with a compensating undo.
pub trait AddonCommand: Send {
    type Output: Send;

    fn operation(&self) -> Operation;

    /// What the command acts on, used as the event subject.
    fn subject(&self) -> String;

    fn execute<'a>(
        &'a mut self,
        ctx: &'a CommandContext,
    ) -> BoxFuture<'a, Result<Self::Output, Failure>>;

    /// Reverts whatever `execute` changed before it failed. Never fails; errors
    /// are logged.
    fn undo<'a>(&'a mut self, ctx: &'a CommandContext) -> BoxFuture<'a, ()>;
}

/// Runs `command`, undoing it on failure.
pub async fn run<C: AddonCommand>(
    command: &mut C,
    ctx: &CommandContext,
) -> Result<C::Output, CommandError> {
    let failure = match command.execute(ctx).await {
        Ok(output) => return Ok(output),
        Err(failure) => failure,
    };

    let operation = command.operation();
    let subject = command.subject();
    let error = match failure {
        Failure::Rejected(error) => {
            tracing::info!(target: "commands", "{} {} refused: {}", operation.as_str(), subject, error);
            error
        }
        Failure::Raised(error) => {
            tracing::error!(target: "commands", "{} {} failed: {:#}", operation.as_str(), subject, error);
            CommandError::Failed {
                message: format!("{error:#}"),
            }
        }
    };

    command.undo(ctx).await;
    ctx.events.emit(&AddonEvent::error(operation, subject, error.to_string()));
    Err(error)
}

pub(crate) fn source_error(origin: AddonType) -> impl FnOnce(ResolveError) -> CommandError {
    move |error| CommandError::Source {
        origin,
        error,
    }
}

/// Copies `folder` into `backup_root`, returning the backup's path.
pub(crate) async fn backup_folder(folder: &Path, backup_root: &Path) -> anyhow::Result<PathBuf> {
    let name = folder.file_name().context("Folder has no name")?.to_owned();
    let backup = backup_root.join(name);
    let (src, dst) = (folder.to_path_buf(), backup.clone());
    tokio::task::spawn_blocking(move || copy_dir(&src, &dst))
        .await
        .context("Backup task panicked")?
        .with_context(|| format!("Failed to back up {}", folder.display()))?;
    Ok(backup)
}

/// Puts a backup back in place, replacing whatever is at `target`. Leaves
/// `target` alone when the backup is gone.
pub(crate) async fn restore_folder(backup: &Path, target: &Path) -> anyhow::Result<()> {
    let (src, dst) = (backup.to_path_buf(), target.to_path_buf());
    tokio::task::spawn_blocking(move || restore_dir(&src, &dst))
        .await
        .context("Restore task panicked")?
        .with_context(|| format!("Failed to restore {}", target.display()))
}

pub(crate) async fn delete_folder(path: &Path) -> anyhow::Result<()> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || remove_dir_all(&target))
        .await
        .context("Delete task panicked")?
        .with_context(|| format!("Failed to delete {}", path.display()))
}
