//! Loading and saving `addons.toml`.
//!
//! ```toml
//! version = 1
//!
//! [[addons]]
//! folder = "ElvUI"
//! name = "ElvUI"
//! version = "13.74"
//! owned_folders = ["ElvUI_Libraries", "ElvUI_Options"]
//! install_date = "2024-10-01T12:00:00Z"
//! last_updated = "2024-10-01T12:00:00Z"
//!
//! [addons.source]
//! type = "tukui"
//! slug = "elvui"
//! url = "https://tukui.org/elvui"
//! ```
//!
//! Older files are migrated on load: every field added after version 1 has a
//! serde default, so a missing key never fails a load. A file written by a newer
//! WAM is refused instead of being rewritten with fields dropped.

use crate::core::WamError;
use crate::models::AddonRecord;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current on-disk format version.
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    addons: Vec<AddonRecord>,
}

/// Reads the store at `path`. A missing or empty file is an empty table.
pub fn load(path: &Path) -> Result<BTreeMap<String, AddonRecord>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read add-on store: {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let file: StoreFile = toml::from_str(&content).map_err(|e| WamError::StoreParseError {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;

    if file.version > CURRENT_VERSION {
        return Err(WamError::StoreVersionUnsupported {
            file: path.display().to_string(),
            found: file.version,
            supported: CURRENT_VERSION,
        }
        .into());
    }
    if file.version < CURRENT_VERSION {
        tracing::info!(
            target: "repository",
            "Migrating add-on store {} from version {} to {}",
            path.display(),
            file.version,
            CURRENT_VERSION
        );
    }

    let mut table = BTreeMap::new();
    for mut record in file.addons {
        record.normalize();
        if table.contains_key(&record.folder) {
            tracing::warn!(target: "repository", "Dropping duplicate store row for '{}'", record.folder);
            continue;
        }
        table.insert(record.folder.clone(), record);
    }
    Ok(table)
}

/// Writes `table` to `path` atomically, sorted by folder.
pub fn save(path: &Path, table: &BTreeMap<String, AddonRecord>) -> Result<()> {
    let file = StoreFile {
        version: CURRENT_VERSION,
        addons: table.values().cloned().collect(),
    };
    let mut content = String::from("# Managed by wam - edits are overwritten\n");
    content.push_str(&toml::to_string_pretty(&file).map_err(WamError::from)?);

    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Cannot write add-on store: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AddonSource;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_missing_and_empty_files() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("addons.toml");
        assert!(load(&path).unwrap().is_empty());

        std::fs::write(&path, "  \n").unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("addons.toml");

        let mut record = AddonRecord::new("ElvUI", Utc::now());
        record.source = AddonSource::Tukui {
            slug: "elvui".to_string(),
            url: "https://tukui.org/elvui".to_string(),
        };
        record.set_owned_folders(["ElvUI_Options", "ElvUI_Libraries"]);
        let table = BTreeMap::from([(record.folder.clone(), record.clone())]);

        save(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("version = 1"));
        assert!(text.contains("[[addons]]"));
        assert_eq!(load(&path).unwrap(), table);
    }

    #[test]
    fn test_migrates_unversioned_minimal_rows() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("addons.toml");
        std::fs::write(
            &path,
            r#"
[[addons]]
folder = "Bagnon"
name = "Bagnon"
owned_folders = ["Bagnon", "Bagnon_Config"]
install_date = "2023-01-01T00:00:00Z"
last_updated = "2023-01-01T00:00:00Z"
"#,
        )
        .unwrap();

        let table = load(&path).unwrap();
        let record = &table["Bagnon"];
        assert_eq!(record.source, AddonSource::Manual);
        assert!(record.version.is_empty());
        // the row's own folder is dropped from its owned set
        assert_eq!(record.owned_folders.iter().collect::<Vec<_>>(), vec!["Bagnon_Config"]);
    }

    #[test]
    fn test_newer_version_is_refused() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("addons.toml");
        std::fs::write(&path, "version = 99\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WamError>(),
            Some(WamError::StoreVersionUnsupported { found: 99, .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version = 99\n");
    }

    #[test]
    fn test_parse_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("addons.toml");
        std::fs::write(&path, "[[addons]\nfolder = ").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<WamError>(), Some(WamError::StoreParseError { .. })));
    }
}
