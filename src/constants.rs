//! Global constants used throughout the WAM codebase.
//!
//! This module contains timeout durations, retry parameters, file names and
//! other values that are used across multiple modules. Defining them centrally
//! keeps magic numbers and folder-name conventions discoverable.

use std::time::Duration;

/// Default timeout for the repository store lock (30 seconds).
///
/// The lock is held for the lifetime of an [`AddonRepository`](crate::repository::AddonRepository),
/// so a second `wam` process waits at most this long before giving up.
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
///
/// Doubles on each retry attempt until [`MAX_BACKOFF_DELAY_MS`] is reached.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Timeout for Git clone operations (120 seconds).
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for `git ls-remote` (30 seconds).
pub const GIT_LS_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single HTTP request against a catalog API (30 seconds).
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for downloading an add-on archive (5 minutes).
pub const HTTP_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// User agent sent with every HTTP request.
pub const USER_AGENT: &str = concat!("wam/", env!("CARGO_PKG_VERSION"));

/// Default number of add-ons updated concurrently by update-all.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// File extension of the manifest marker file inside every add-on folder.
pub const MANIFEST_EXTENSION: &str = "toc";

/// Sub-directory names that conventionally hold embedded libraries.
pub const EMBEDDED_LIB_DIRS: &[&str] = &["Libs", "libs", "Lib", "lib", "Libraries", "libraries"];

/// Directory names that never count as installable add-on folders.
pub const IGNORED_STAGING_DIRS: &[&str] = &[".git", "__MACOSX"];

/// File name of the persisted add-on table.
pub const REPOSITORY_FILE: &str = "addons.toml";

/// Suffix shared by every settings backup archive.
pub const SETTINGS_BACKUP_SUFFIX: &str = "_settings.zip";

/// `chrono` format of the timestamp prefix of settings backup archives.
///
/// The format sorts lexicographically in chronological order.
pub const SETTINGS_BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Environment variable that disables progress bars when set.
pub const NO_PROGRESS_ENV: &str = "WAM_NO_PROGRESS";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "WAM_CONFIG_PATH";
