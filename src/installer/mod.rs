//! Staging, extraction and copying of add-on releases.
//!
//! Installing a release happens in three steps, each driven by a command:
//!
//! 1. [`Installer::fetch`] creates a fresh uuid-named staging directory and
//!    either clones the repository into it or downloads the archive next to it.
//! 2. [`Staging::extract`] unpacks the archive (a no-op for clones) and
//!    [`Staging::discover`] lists the installable folders.
//! 3. [`Installer::copy_folder`] replaces a destination folder with the staged
//!    one.
//!
//! Nothing is written to the destination before step 3, and step 3 is
//! destructive: callers that need rollback back the destination up first. The
//! staging directory is removed when [`Staging`] is dropped, including when a
//! step fails.

pub mod archive;
pub mod discovery;

#[cfg(test)]
mod tests;

pub use discovery::DiscoveredFolder;

use crate::git;
use crate::source::{Artifact, HttpClient};
use crate::utils::fs::{TempDir, ensure_dir, remove_dir_all, replace_dir};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes staged folders into the destination and deletes folders from it.
///
/// The default [`ReplaceCopier`] removes the destination folder and copies the
/// staged tree in its place.
pub trait FolderCopier: Send + Sync {
    fn copy_folder(&self, staged: &Path, target: &Path) -> Result<()>;

    fn remove_folder(&self, target: &Path) -> Result<()> {
        remove_dir_all(target)
    }
}

/// Replaces the target folder with a copy of the staged one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceCopier;

impl FolderCopier for ReplaceCopier {
    fn copy_folder(&self, staged: &Path, target: &Path) -> Result<()> {
        replace_dir(staged, target)
    }
}

/// Fetches artifacts into staging directories and copies folders out of them.
#[derive(Clone)]
pub struct Installer {
    http: HttpClient,
    copier: Arc<dyn FolderCopier>,
}

impl Installer {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            copier: Arc::new(ReplaceCopier),
        }
    }

    /// Replaces the strategy used to write folders into the destination.
    #[must_use]
    pub fn with_copier(mut self, copier: Arc<dyn FolderCopier>) -> Self {
        self.copier = copier;
        self
    }

    /// Brings `artifact` into a new staging directory.
    pub async fn fetch(&self, artifact: &Artifact) -> Result<Staging> {
        let dir = TempDir::new("stage")?;
        let tree = dir.path().join("tree");

        match artifact {
            Artifact::Clone {
                url,
            } => {
                git::ensure_git_available()?;
                tracing::debug!(target: "installer", "Cloning {} into {}", git::strip_auth_from_url(url), tree.display());
                if !git::shallow_clone(url, &tree).await {
                    return Err(crate::core::WamError::GitCloneFailed {
                        url: git::strip_auth_from_url(url),
                        reason: "git clone did not complete, see the log for details".to_string(),
                    }
                    .into());
                }
                Ok(Staging {
                    dir,
                    tree,
                    archive: None,
                })
            }
            Artifact::Archive {
                url,
            } => {
                let archive = dir.path().join("download.zip");
                tracing::debug!(target: "installer", "Downloading {} to {}", url, archive.display());
                self.http.download(url, &archive).await?;
                Ok(Staging {
                    dir,
                    tree,
                    archive: Some(archive),
                })
            }
        }
    }

    /// Writes `folder` into `destination`, replacing any existing folder of the
    /// same name.
    pub async fn copy_folder(&self, folder: &DiscoveredFolder, destination: &Path) -> Result<()> {
        let copier = Arc::clone(&self.copier);
        let staged = folder.path.clone();
        let target = destination.join(&folder.name);
        tracing::debug!(target: "installer", "Copying {} -> {}", staged.display(), target.display());

        tokio::task::spawn_blocking(move || copier.copy_folder(&staged, &target))
            .await
            .context("Copy task panicked")?
            .with_context(|| format!("Failed to install folder {}", folder.name))
    }

    /// Deletes the folder `name` from `destination`. A missing folder is not an
    /// error.
    pub async fn remove_folder(&self, destination: &Path, name: &str) -> Result<()> {
        let copier = Arc::clone(&self.copier);
        let target = destination.join(name);
        tracing::debug!(target: "installer", "Removing {}", target.display());

        tokio::task::spawn_blocking(move || copier.remove_folder(&target))
            .await
            .context("Delete task panicked")?
            .with_context(|| format!("Failed to delete folder {name}"))
    }
}

/// A fetched release waiting to be installed. Removed from disk on drop.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    tree: PathBuf,
    archive: Option<PathBuf>,
}

impl Staging {
    /// Root of the staged tree.
    #[must_use]
    pub fn tree(&self) -> &Path {
        &self.tree
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Unpacks the downloaded archive into the tree.
    pub async fn extract(&mut self) -> Result<()> {
        let Some(archive) = self.archive.take() else {
            return Ok(());
        };
        let tree = self.tree.clone();
        ensure_dir(&tree)?;
        tokio::task::spawn_blocking(move || archive::extract_zip(&archive, &tree))
            .await
            .context("Extraction task panicked")??;
        Ok(())
    }

    /// Lists the installable folders of the staged tree.
    pub fn discover(&self, source_name: &str) -> Result<Vec<DiscoveredFolder>> {
        discovery::discover(&self.tree, source_name)
    }
}
