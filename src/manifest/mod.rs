//! Add-on manifest (`.toc`) parsing.
//!
//! Every add-on folder carries a `<Folder>.toc` file whose header is a list of
//! `## Key: Value` lines:
//!
//! ```text
//! ## Interface: 110002
//! ## Title: |cff1784d1ElvUI|r
//! ## Version: 13.74
//! ## Author: Elv, Simpy
//! ## RequiredDeps: ElvUI_Libraries
//! ## OptionalDeps: Masque, LibSharedMedia-3.0
//! ```
//!
//! Titles often embed `|cAARRGGBB ... |r` colour escapes, which are stripped
//! before the title is stored.

use crate::constants::MANIFEST_EXTENSION;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static COLOR_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\|c[0-9a-fA-F]{8}|\|r").ok());

/// Parsed header of a `.toc` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocManifest {
    pub title: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub interface: Option<String>,
    pub required_deps: BTreeSet<String>,
    pub optional_deps: BTreeSet<String>,
    /// Every header field as written, keyed by its original name
    pub fields: BTreeMap<String, String>,
}

impl TocManifest {
    /// Parses the `## Key: Value` lines of a manifest.
    ///
    /// Unknown keys are kept in [`fields`](Self::fields). Later duplicates win.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut manifest = Self::default();

        for line in content.lines() {
            let line = line.trim_start_matches('\u{feff}').trim();
            let Some(header) = line.strip_prefix("##") else {
                continue;
            };
            let Some((key, value)) = header.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                continue;
            }

            manifest.fields.insert(key.to_string(), value.to_string());
            let lower = key.to_ascii_lowercase();
            let non_empty = || (!value.is_empty()).then(|| value.to_string());

            match lower.as_str() {
                "title" => manifest.title = non_empty().map(|t| strip_color_codes(&t)),
                "version" => manifest.version = non_empty(),
                "author" => manifest.author = non_empty().map(|a| strip_color_codes(&a)),
                "interface" => manifest.interface = non_empty(),
                "optionaldeps" => manifest.optional_deps.extend(split_list(value)),
                "requireddeps" => manifest.required_deps.extend(split_list(value)),
                k if is_dependency_key(k) => manifest.required_deps.extend(split_list(value)),
                _ => {}
            }
        }

        manifest
    }

    /// Whether the manifest describes a library rather than a user-facing add-on.
    #[must_use]
    pub fn is_library(&self, folder: &str) -> bool {
        let category = self
            .fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("X-Category"))
            .map(|(_, v)| v.to_ascii_lowercase());
        if category.is_some_and(|c| c.contains("librar")) {
            return true;
        }
        looks_like_library_name(folder)
    }
}

fn looks_like_library_name(name: &str) -> bool {
    // LibStub, LibDBIcon-1.0, but not Libra or Library names in lowercase
    name.strip_prefix("Lib")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_ascii_lowercase())
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `Dependencies`, `Dep`, `Deps` or `Dep` followed by a number, in lowercase.
fn is_dependency_key(key: &str) -> bool {
    match key.strip_prefix("dep") {
        Some("endencies" | "s") => true,
        Some(rest) => rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Removes `|cAARRGGBB` and `|r` colour escapes.
#[must_use]
pub fn strip_color_codes(text: &str) -> String {
    let stripped = match COLOR_CODE.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    stripped.trim().to_string()
}

/// Whether `path` has the manifest extension.
#[must_use]
pub fn is_manifest(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}

/// Finds the manifest of the add-on in `folder`.
///
/// Prefers `<folder>.toc`, then a flavor specific `<folder>_<Suffix>.toc`, then
/// the first `.toc` by name.
pub fn find_manifest(folder: &Path) -> Option<PathBuf> {
    let name = folder.file_name()?.to_string_lossy().into_owned();
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(folder)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_manifest(p))
        .collect();
    candidates.sort();

    let stem = |p: &PathBuf| p.file_stem().map(|s| s.to_string_lossy().into_owned());

    candidates
        .iter()
        .find(|p| stem(p).is_some_and(|s| s == name))
        .or_else(|| {
            candidates.iter().find(|p| {
                stem(p).is_some_and(|s| {
                    s.strip_prefix(name.as_str()).is_some_and(|rest| rest.starts_with(['_', '-']))
                })
            })
        })
        .or_else(|| candidates.first())
        .cloned()
}

/// Reads and parses the manifest of `folder`, if it has one.
pub fn read_manifest(folder: &Path) -> Result<Option<TocManifest>> {
    let Some(path) = find_manifest(folder) else {
        return Ok(None);
    };
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(TocManifest::parse(&String::from_utf8_lossy(&bytes))))
}
