//! Temporary directory management with RAII cleanup.
//!
//! Staging areas for downloads and the pre-image backups taken by update and
//! remove live in a [`TempDir`], so they disappear even when a command bails
//! out half way.

use crate::utils::fs::dirs::{ensure_dir, remove_dir_all};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// A uniquely named directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    /// Creates `wam_<prefix>_<uuid>` under [`std::env::temp_dir`].
    pub fn new(prefix: &str) -> Result<Self> {
        let temp_dir = std::env::temp_dir();
        let unique_name = format!("wam_{}_{}", prefix, uuid::Uuid::new_v4());
        let path = temp_dir.join(unique_name);

        ensure_dir(&path)?;

        Ok(Self {
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if let Err(e) = remove_dir_all(&self.path) {
            tracing::warn!("Failed to clean up {}: {}", self.path.display(), e);
        }
    }
}
