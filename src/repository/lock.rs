//! Cross-process lock on the add-on store.
//!
//! A second `wam` process pointed at the same store waits for the lock with
//! exponential backoff instead of interleaving writes. The lock file lives next
//! to the store and is removed again when the lock is dropped.
//!
//! File operations run through `spawn_blocking` so a contended lock never stalls
//! a runtime worker.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, default_lock_timeout};
use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// Exclusive advisory lock on a store file, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    _file: Arc<File>,
    lock_path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        debug!(target: "repository", lock = %self.lock_path.display(), "Store lock released");
        if let Err(e) = std::fs::remove_file(&self.lock_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(target: "repository", error = %e, "Failed to remove lock file");
        }
    }
}

impl StoreLock {
    /// Path of the lock file guarding `store`.
    #[must_use]
    pub fn path_for(store: &Path) -> PathBuf {
        let mut name = store.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".lock");
        store.with_file_name(name)
    }

    pub async fn acquire(store: &Path) -> Result<Self> {
        Self::acquire_with_timeout(store, default_lock_timeout()).await
    }

    pub async fn acquire_with_timeout(store: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = Self::path_for(store);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
        }
        debug!(target: "repository", lock = %lock_path.display(), "Waiting for store lock");

        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .context("spawn_blocking panicked")?
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        let file = Arc::new(file);

        let start = std::time::Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let attempt = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || attempt.try_lock_exclusive())
                .await
                .context("spawn_blocking panicked")?;

            if matches!(locked, Ok(true)) {
                debug!(
                    target: "repository",
                    lock = %lock_path.display(),
                    wait_ms = start.elapsed().as_millis(),
                    "Store lock acquired"
                );
                return Ok(Self {
                    _file: file,
                    lock_path,
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(anyhow::anyhow!(
            "Timeout acquiring the add-on store lock {} after {:?}; is another wam process running?",
            lock_path.display(),
            timeout
        ))
    }
}
