//! Rate-limited archives of the game's `WTF` settings directory.
//!
//! Archives are named `YYYYMMDDTHHMMSS_settings.zip` (UTC). The newest name
//! decides whether a new archive is due, so no bookkeeping file is needed.
//! The due check and the write are not synchronized: two processes starting
//! at the same moment may both write an archive.

use crate::config::Settings;
use crate::constants::{SETTINGS_BACKUP_SUFFIX, SETTINGS_BACKUP_TIMESTAMP_FORMAT};
use crate::installer::archive::zip_dir;
use crate::utils::fs::ensure_dir;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

/// What [`SettingsBackup::run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// A new archive was written; older ones beyond the limit were pruned
    Created {
        path: PathBuf,
        pruned: Vec<PathBuf>,
    },
    /// The newest archive is younger than the interval
    NotDue {
        newest: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct SettingsBackup {
    source: PathBuf,
    directory: PathBuf,
    interval: Duration,
    keep: usize,
}

impl SettingsBackup {
    /// Backs up `source` into `directory` once a day, keeping ten archives.
    pub fn new(source: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            directory: directory.into(),
            interval: Duration::hours(24),
            keep: 10,
        }
    }

    /// Builds the backup described by `settings.backup`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let interval = i64::try_from(settings.backup.interval_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        Ok(Self::new(settings.backup_source_dir()?, settings.backup_dir()?)
            .with_interval(interval)
            .with_keep(settings.backup.keep))
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Number of archives left after pruning; never below one.
    #[must_use]
    pub fn with_keep(mut self, keep: usize) -> Self {
        self.keep = keep.max(1);
        self
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Existing archives, oldest first. Files without a parseable timestamp
    /// prefix are ignored.
    pub fn archives(&self) -> Result<Vec<(NaiveDateTime, PathBuf)>> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }
        let mut archives = Vec::new();
        for entry in std::fs::read_dir(&self.directory)
            .with_context(|| format!("Failed to read {}", self.directory.display()))?
        {
            let path = entry?.path();
            if let Some(taken) = archive_timestamp(&path) {
                archives.push((taken, path));
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Whether the newest archive is older than the interval at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(match self.archives()?.last() {
            Some((taken, _)) => now.naive_utc() - *taken >= self.interval,
            None => true,
        })
    }

    /// Writes a new archive when due (or `force`), then prunes.
    pub async fn run(&self, force: bool, now: DateTime<Utc>) -> Result<BackupOutcome> {
        if !force
            && !self.is_due(now)?
            && let Some((_, newest)) = self.archives()?.pop()
        {
            tracing::debug!(target: "orchestrator", "Settings backup not due, newest is {}", newest.display());
            return Ok(BackupOutcome::NotDue {
                newest,
            });
        }

        if !self.source.is_dir() {
            bail!("Settings directory {} does not exist", self.source.display());
        }
        ensure_dir(&self.directory)?;

        let name = format!("{}{}", now.format(SETTINGS_BACKUP_TIMESTAMP_FORMAT), SETTINGS_BACKUP_SUFFIX);
        let path = self.directory.join(name);
        let partial = path.with_extension("zip.partial");

        let (source, target) = (self.source.clone(), partial.clone());
        let written = tokio::task::spawn_blocking(move || zip_dir(&source, &target))
            .await
            .context("Backup task panicked")?;
        let files = match written {
            Ok(files) => files,
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                return Err(e.context(format!("Failed to archive {}", self.source.display())));
            }
        };
        std::fs::rename(&partial, &path)
            .with_context(|| format!("Failed to move backup into {}", path.display()))?;
        tracing::info!(target: "orchestrator", "Backed up {} files to {}", files, path.display());

        let pruned = self.prune()?;
        Ok(BackupOutcome::Created {
            path,
            pruned,
        })
    }

    fn prune(&self) -> Result<Vec<PathBuf>> {
        let archives = self.archives()?;
        let excess = archives.len().saturating_sub(self.keep);
        let mut pruned = Vec::with_capacity(excess);
        for (_, path) in archives.into_iter().take(excess) {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to prune {}", path.display()))?;
            tracing::debug!(target: "orchestrator", "Pruned {}", path.display());
            pruned.push(path);
        }
        Ok(pruned)
    }
}

fn archive_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_suffix(SETTINGS_BACKUP_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, SETTINGS_BACKUP_TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn setup() -> (tempfile::TempDir, SettingsBackup) {
        let temp = tempdir().unwrap();
        let wtf = temp.path().join("WTF");
        std::fs::create_dir_all(wtf.join("Account")).unwrap();
        std::fs::write(wtf.join("Config.wtf"), "SET locale \"enUS\"").unwrap();
        let backup = SettingsBackup::new(&wtf, temp.path().join("backups"));
        (temp, backup)
    }

    #[test]
    fn test_archive_timestamp() {
        assert_eq!(
            archive_timestamp(Path::new("/b/20240301T120000_settings.zip")),
            Some(at(1, 12).naive_utc())
        );
        assert_eq!(archive_timestamp(Path::new("/b/notes.txt")), None);
        assert_eq!(archive_timestamp(Path::new("/b/garbage_settings.zip")), None);
    }

    #[tokio::test]
    async fn test_first_backup_is_due() {
        let (_temp, backup) = setup();
        assert!(backup.is_due(at(1, 0)).unwrap());

        let outcome = backup.run(false, at(1, 0)).await.unwrap();
        let BackupOutcome::Created {
            path,
            pruned,
        } = outcome
        else {
            panic!("expected a new archive, got {outcome:?}");
        };
        assert!(path.ends_with("20240301T000000_settings.zip"));
        assert!(pruned.is_empty());

        let file = std::fs::File::open(&path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        assert!(zip.by_name("WTF/Config.wtf").is_ok());
    }

    #[tokio::test]
    async fn test_interval_limits_backups() {
        let (_temp, backup) = setup();
        backup.run(false, at(1, 0)).await.unwrap();

        let outcome = backup.run(false, at(1, 12)).await.unwrap();
        assert!(matches!(outcome, BackupOutcome::NotDue { .. }));
        assert_eq!(backup.archives().unwrap().len(), 1);

        let outcome = backup.run(false, at(2, 0)).await.unwrap();
        assert!(matches!(outcome, BackupOutcome::Created { .. }));
        assert_eq!(backup.archives().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_force_ignores_interval() {
        let (_temp, backup) = setup();
        backup.run(false, at(1, 0)).await.unwrap();
        let outcome = backup.run(true, at(1, 1)).await.unwrap();
        assert!(matches!(outcome, BackupOutcome::Created { .. }));
        assert_eq!(backup.archives().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_prunes_oldest() {
        let (_temp, backup) = setup();
        let backup = backup.with_keep(2);
        for day in 1..=4 {
            backup.run(false, at(day, 0)).await.unwrap();
        }
        let names: Vec<_> = backup
            .archives()
            .unwrap()
            .into_iter()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["20240303T000000_settings.zip", "20240304T000000_settings.zip"]);
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let temp = tempdir().unwrap();
        let backup = SettingsBackup::new(temp.path().join("nope"), temp.path().join("backups"));
        let err = backup.run(false, at(1, 0)).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(backup.archives().unwrap().is_empty());
    }
}
