//! Directory operations for creating, copying, moving and removing directories.
//!
//! Add-on installs replace whole folders at a time, so the helpers here work on
//! directory trees rather than single files.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Creates a directory and all parents if it does not exist yet.
///
/// Fails if `path` exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    let safe_path = crate::utils::platform::windows_long_path(path);

    if !safe_path.exists() {
        fs::create_dir_all(&safe_path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check that the path length is < 260 chars or that long path support is enabled"
            } else {
                "Check directory permissions and path validity"
            };

            format!("Failed to create directory: {}\n\n{}", path.display(), platform_help)
        })?;
    } else if !safe_path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Creates the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Recursively copies `src` into `dst`, creating `dst` if needed.
///
/// Existing files in `dst` are overwritten, other existing files are left alone.
/// Symlinks are skipped.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!("Failed to copy file from {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }

    Ok(())
}

/// Replaces `dst` with a copy of `src`.
///
/// Anything previously at `dst` is removed first, so no stale files from an
/// older version survive.
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    remove_dir_all(dst)?;
    copy_dir(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))
}

/// Puts a copy of `backup` at `dst`.
///
/// The copy is written to a hidden sibling of `dst` and renamed into place, so
/// `dst` is only removed once a complete copy exists. A missing backup fails
/// without touching `dst`.
pub fn restore_dir(backup: &Path, dst: &Path) -> Result<()> {
    if !backup.is_dir() {
        return Err(anyhow::anyhow!("Backup is missing: {}", backup.display()));
    }
    let name = dst.file_name().with_context(|| format!("No folder name in {}", dst.display()))?;
    let sibling = dst.with_file_name(format!(
        ".{}.restore-{}",
        name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    ));

    if let Err(e) = copy_dir(backup, &sibling) {
        let _ = remove_dir_all(&sibling);
        return Err(e.context(format!("Failed to stage restore of {}", dst.display())));
    }
    if let Err(e) = remove_dir_all(dst).and_then(|()| {
        fs::rename(&sibling, dst)
            .with_context(|| format!("Failed to move restored folder into {}", dst.display()))
    }) {
        let _ = remove_dir_all(&sibling);
        return Err(e);
    }
    Ok(())
}

/// Removes a directory tree; a missing directory is not an error.
///
/// A symlink is unlinked rather than followed.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if metadata.file_type().is_symlink() || metadata.is_file() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    } else {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Lists the names of the immediate sub-directories of `path`, sorted.
pub fn list_subdirectories(path: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in
        fs::read_dir(path).with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
