//! Finds the installable add-on folders inside a staged release.

use crate::constants::{IGNORED_STAGING_DIRS, MANIFEST_EXTENSION};
use crate::core::WamError;
use crate::manifest::is_manifest;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A folder ready to be copied into the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFolder {
    /// Directory name it will have inside the destination
    pub name: String,
    /// Where it lives in the staging tree
    pub path: PathBuf,
}

/// Lists the add-on folders of a staged tree.
///
/// A manifest directly in `root` means the whole tree is one loose add-on named
/// after the manifest (the shortest name if there are several). Otherwise
/// every first-level directory containing a manifest at any depth is a folder.
/// Manifests of libraries embedded deeper never become folders of their own.
pub fn discover(root: &Path, source_name: &str) -> Result<Vec<DiscoveredFolder>> {
    let mut root_manifests: Vec<String> = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read staging directory {}", root.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| is_manifest(p))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();

    if !root_manifests.is_empty() {
        root_manifests.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        let name = root_manifests.swap_remove(0);
        tracing::debug!(target: "installer", "Loose add-on '{}' at staging root", name);
        return Ok(vec![DiscoveredFolder {
            name,
            path: root.to_path_buf(),
        }]);
    }

    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root)
        .with_context(|| format!("Failed to read staging directory {}", root.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if IGNORED_STAGING_DIRS.contains(&name.as_str()) {
            continue;
        }
        if contains_manifest(&entry.path()) {
            folders.push(DiscoveredFolder {
                name,
                path: entry.path(),
            });
        }
    }

    if folders.is_empty() {
        return Err(WamError::NoInstallableFolders {
            source_name: source_name.to_string(),
        }
        .into());
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

fn contains_manifest(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(Result::ok)
        .any(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .and_then(|x| x.to_str())
                    .is_some_and(|x| x.eq_ignore_ascii_case(MANIFEST_EXTENSION))
        })
}
