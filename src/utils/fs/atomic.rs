//! Atomic file write operations using temp-and-rename strategy.
//!
//! Used for the add-on store and configuration file so an interrupted write
//! never leaves a truncated file behind.

use crate::utils::fs::dirs::ensure_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Writes `content` to `path` atomically.
///
/// The data is written and synced to a sibling `.tmp` file which is then
/// renamed over the target.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let safe_path = crate::utils::platform::windows_long_path(path);

    if let Some(parent) = safe_path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = safe_path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).with_context(|| {
            format!("Failed to create temp file: {}", temp_path.display())
        })?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, &safe_path)
        .with_context(|| format!("Failed to rename temp file to: {}", safe_path.display()))?;

    Ok(())
}
