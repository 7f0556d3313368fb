//! Zip archive extraction and creation.
//!
//! Extraction refuses any archive containing an entry that would land outside
//! the target directory (`../` components, absolute paths). The whole archive
//! is rejected rather than the entry skipped, since a release that tries to
//! escape its directory cannot be trusted for the remaining entries either.

use crate::core::WamError;
use crate::utils::fs::ensure_dir;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

/// Extracts `archive` into `dest`, returning the number of files written.
///
/// Blocking; call through `spawn_blocking` from async code.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let extraction_failed = |reason: String| WamError::ExtractionFailed {
        archive: archive.display().to_string(),
        reason,
    };

    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| extraction_failed(e.to_string()))?;

    // Validate every entry before writing anything
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(|e| extraction_failed(e.to_string()))?;
        if entry.enclosed_name().is_none() {
            tracing::warn!(target: "installer", "Rejecting archive {}: entry '{}' escapes the target", archive.display(), entry.name());
            return Err(WamError::PathTraversal {
                entry: entry.name().to_string(),
            }
            .into());
        }
    }

    ensure_dir(dest)?;
    let mut files = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| extraction_failed(e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            ensure_dir(parent)?;
        }
        let mut out_file = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out_file)
            .map_err(|e| extraction_failed(format!("{}: {e}", out_path.display())))?;
        files += 1;
    }

    tracing::debug!(target: "installer", "Extracted {} files from {}", files, archive.display());
    Ok(files)
}

/// Writes every file below `src` into a new zip at `dest`, paths relative to
/// `src`'s parent so the archive unpacks to a directory named like `src`.
pub fn zip_dir(src: &Path, dest: &Path) -> Result<usize> {
    let base = src.parent().unwrap_or(src);
    let file = File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut files = 0;
    let mut buffer = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            buffer.clear();
            File::open(entry.path())?.read_to_end(&mut buffer)?;
            writer.write_all(&buffer)?;
            files += 1;
        }
    }
    writer.finish()?;
    Ok(files)
}
