//! Chooses the parent folder of a multi-folder release.
//!
//! Releases such as DBM or ElvUI install several sibling folders. Only one of
//! them is tracked as an add-on; the others become its owned folders. The
//! parent is chosen by an ordered list of rules, each a pure function returning
//! `Some(folder)` when it applies. The first rule that answers wins:
//!
//! 1. the only folder
//! 2. the folder named like the release's target name
//! 3. the folder named like the source's secondary display name
//! 4. the shortest folder, when it prefixes at least half of all folders
//! 5. the shortest folder contained in the target name, or containing it
//! 6. the shortest folder
//!
//! Comparisons against names are case-insensitive. "Shortest" orders by length
//! and then lexicographically, so the outcome never depends on input order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// What a source knows about the expected parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentHints<'a> {
    /// Folder name the release is expected to install as
    pub target_name: &'a str,
    /// Additional display name some catalogs provide
    pub secondary_name: Option<&'a str>,
}

/// A release split into its parent folder and the folders it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub parent: String,
    pub owned: BTreeSet<String>,
}

type Rule = fn(&[String], &ParentHints<'_>) -> Option<String>;

const RULES: &[(&str, Rule)] = &[
    ("single folder", single_folder),
    ("target name", matches_target_name),
    ("secondary name", matches_secondary_name),
    ("prefix majority", prefix_majority),
    ("name overlap", overlaps_target_name),
    ("shortest", shortest),
];

/// Picks the parent among `folders`. `None` only when `folders` is empty.
#[must_use]
pub fn resolve_parent(folders: &[String], hints: &ParentHints<'_>) -> Option<String> {
    RULES.iter().find_map(|(name, rule)| {
        let parent = rule(folders, hints)?;
        tracing::debug!(target: "ownership", "Parent '{}' chosen by rule '{}'", parent, name);
        Some(parent)
    })
}

/// Resolves the parent and derives the owned set from the remaining folders.
#[must_use]
pub fn classify(folders: &[String], hints: &ParentHints<'_>) -> Option<Ownership> {
    let parent = resolve_parent(folders, hints)?;
    Some(with_parent(folders, parent))
}

/// Builds the [`Ownership`] of a release whose parent is already known.
#[must_use]
pub fn with_parent(folders: &[String], parent: String) -> Ownership {
    let owned = folders.iter().filter(|f| **f != parent).cloned().collect();
    Ownership {
        parent,
        owned,
    }
}

fn by_length(a: &&String, b: &&String) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn single_folder(folders: &[String], _: &ParentHints<'_>) -> Option<String> {
    match folders {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn find_named(folders: &[String], name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    folders.iter().find(|f| f.eq_ignore_ascii_case(name)).cloned()
}

fn matches_target_name(folders: &[String], hints: &ParentHints<'_>) -> Option<String> {
    find_named(folders, hints.target_name)
}

fn matches_secondary_name(folders: &[String], hints: &ParentHints<'_>) -> Option<String> {
    find_named(folders, hints.secondary_name?)
}

fn prefix_majority(folders: &[String], _: &ParentHints<'_>) -> Option<String> {
    let shortest = folders.iter().min_by(by_length)?;
    let prefixed = folders.iter().filter(|f| f.starts_with(shortest.as_str())).count();
    // at least half, inclusive
    (prefixed * 2 >= folders.len()).then(|| shortest.clone())
}

fn overlaps_target_name(folders: &[String], hints: &ParentHints<'_>) -> Option<String> {
    let target = hints.target_name.to_lowercase();
    if target.is_empty() {
        return None;
    }
    folders
        .iter()
        .filter(|f| {
            let folder = f.to_lowercase();
            target.contains(&folder) || folder.contains(&target)
        })
        .min_by(by_length)
        .cloned()
}

fn shortest(folders: &[String], _: &ParentHints<'_>) -> Option<String> {
    folders.iter().min_by(by_length).cloned()
}
