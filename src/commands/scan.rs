//! Reconciles the repository with what is on disk.
//!
//! Scan looks at every folder directly below the destination that has a
//! manifest. A folder nobody tracks becomes a manual record. A tracked folder
//! gets the fields that drifted refreshed:
//!
//! - name, author, interface version and dependency lists from the manifest
//! - embedded libraries from `Libs`-style sub-directories
//! - the commit and origin of a `.git` checkout
//! - `kind`, unless the user classified the folder by hand
//!
//! Scan only ever adds information. It never turns a tracked source back into
//! a manual one, and the version of a catalog add-on stays whatever its source
//! reported, since manifests often lag behind the catalog.

use super::{AddonCommand, CommandContext, Failure};
use crate::constants::EMBEDDED_LIB_DIRS;
use crate::events::{Operation, Stage};
use crate::git;
use crate::manifest::{self, TocManifest};
use crate::models::{AddonKind, AddonRecord, AddonSource};
use crate::utils::fs::list_subdirectories;
use anyhow::Result;
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::path::Path;

/// Folders grouped by what Scan did to their records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanCommand {
    only: Option<BTreeSet<String>>,
}

/// What a folder on disk says about itself.
#[derive(Debug, Clone, Default)]
struct FolderInfo {
    manifest: TocManifest,
    checkout: Option<Checkout>,
    embedded_libs: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct Checkout {
    url: String,
    head: String,
}

impl ScanCommand {
    /// Scans every folder of the destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans only the named folders.
    #[must_use]
    pub fn restricted_to<I, S>(folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: Some(folders.into_iter().map(Into::into).collect()),
        }
    }

    pub(crate) async fn scan(&self, ctx: &CommandContext) -> Result<ScanReport, Failure> {
        let destination = ctx.destination()?;
        let mut report = ScanReport::default();

        for folder in list_subdirectories(&destination)? {
            if folder.starts_with('.')
                || self.only.as_ref().is_some_and(|only| !only.contains(&folder))
            {
                continue;
            }
            if let Some(owner) = ctx.repository.owner_of(&folder) {
                tracing::trace!(target: "commands", "Skipping '{}', owned by '{}'", folder, owner.folder);
                continue;
            }

            let Some(info) = inspect(&destination.join(&folder)).await? else {
                continue;
            };

            match ctx.repository.get(&folder) {
                None => {
                    let mut record = AddonRecord::new(&folder, Utc::now());
                    record.version = info.manifest.version.clone().unwrap_or_default();
                    apply(&mut record, &info);
                    ctx.repository.insert(record)?;
                    tracing::info!(target: "commands", "Found untracked add-on '{}'", folder);
                    report.added.push(folder);
                }
                Some(existing) => {
                    let mut record = existing.clone();
                    apply(&mut record, &info);
                    if record == existing {
                        report.unchanged.push(folder);
                    } else {
                        ctx.repository.upsert(record)?;
                        tracing::debug!(target: "commands", "Refreshed '{}' from disk", folder);
                        report.updated.push(folder);
                    }
                }
            }
        }

        Ok(report)
    }
}

impl AddonCommand for ScanCommand {
    type Output = ScanReport;

    fn operation(&self) -> Operation {
        Operation::Scan
    }

    fn subject(&self) -> String {
        match &self.only {
            Some(only) => only.iter().cloned().collect::<Vec<_>>().join(","),
            None => "destination".to_string(),
        }
    }

    fn execute<'a>(
        &'a mut self,
        ctx: &'a CommandContext,
    ) -> BoxFuture<'a, Result<Self::Output, Failure>> {
        Box::pin(async move {
            let subject = self.subject();
            ctx.emit(Operation::Scan, Stage::Start, &subject);
            let report = self.scan(ctx).await?;
            ctx.emit(Operation::Scan, Stage::Complete, &subject);
            Ok(report)
        })
    }

    fn undo<'a>(&'a mut self, _ctx: &'a CommandContext) -> BoxFuture<'a, ()> {
        // Scan only adds rows that describe what is on disk
        Box::pin(async {})
    }
}

/// Reads the manifest, checkout and embedded libraries of `path`. `None` when
/// the folder has no manifest.
async fn inspect(path: &Path) -> Result<Option<FolderInfo>> {
    let Some(manifest) = manifest::read_manifest(path)? else {
        return Ok(None);
    };

    let checkout = if git::is_valid_git_repo(path) {
        match (git::remote_url(path).await, git::local_head(path).await) {
            (Some(url), Some(head)) => Some(Checkout {
                url,
                head,
            }),
            _ => None,
        }
    } else {
        None
    };

    Ok(Some(FolderInfo {
        manifest,
        checkout,
        embedded_libs: embedded_libs(path),
    }))
}

/// Names of library folders bundled inside `path`.
fn embedded_libs(path: &Path) -> BTreeSet<String> {
    EMBEDDED_LIB_DIRS
        .iter()
        .map(|dir| path.join(dir))
        .filter(|dir| dir.is_dir())
        .filter_map(|dir| list_subdirectories(&dir).ok().map(|names| (dir, names)))
        .flat_map(|(dir, names)| {
            names.into_iter().filter(move |name| manifest::find_manifest(&dir.join(name)).is_some())
        })
        .collect()
}

fn apply(record: &mut AddonRecord, info: &FolderInfo) {
    let manifest = &info.manifest;

    if let Some(title) = &manifest.title {
        record.name.clone_from(title);
    }
    if let Some(author) = &manifest.author {
        record.author.clone_from(author);
    }
    if manifest.interface.is_some() {
        record.interface_version.clone_from(&manifest.interface);
    }
    record.required_deps.clone_from(&manifest.required_deps);
    record.optional_deps.clone_from(&manifest.optional_deps);
    record.embedded_libs.clone_from(&info.embedded_libs);

    if !record.kind_override {
        record.kind = if manifest.is_library(&record.folder) {
            AddonKind::Library
        } else {
            AddonKind::Addon
        };
    }

    let is_manual = matches!(record.source, AddonSource::Manual);
    match &info.checkout {
        Some(checkout) if is_manual => {
            record.source = AddonSource::Git {
                url: checkout.url.clone(),
                commit: Some(checkout.head.clone()),
            };
            record.version.clone_from(&checkout.head);
        }
        Some(checkout) => {
            if let AddonSource::Git {
                commit,
                ..
            } = &mut record.source
                && !commit.as_deref().is_some_and(|c| git::hashes_match(c, &checkout.head))
            {
                *commit = Some(checkout.head.clone());
                record.version.clone_from(&checkout.head);
            }
        }
        None => {}
    }

    let manual_without_checkout = is_manual && info.checkout.is_none();
    if (manual_without_checkout || record.version.is_empty())
        && let Some(version) = &manifest.version
    {
        record.version.clone_from(version);
    }
}
