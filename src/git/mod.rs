//! Git operations for add-ons installed from a version-control host
//!
//! WAM uses the system `git` binary rather than an embedded implementation, so
//! SSH agents, credential helpers and user configuration all keep working.
//!
//! The operations here are deliberately coarse. A git add-on only ever needs to
//! be cloned, compared against the remote HEAD, and inspected on disk, and a
//! failure of any of those is not something the caller can act on beyond
//! "could not clone" or "remote unknown". Each function therefore collapses
//! failures to `false` / `None` after logging them under the `git` target.
//!
//! | Operation | Result |
//! |-----------|--------|
//! | [`shallow_clone`] | `true` when the tree was cloned |
//! | [`remote_head`] | commit hash of the remote `HEAD` |
//! | [`local_head`] | commit hash checked out in a folder |
//! | [`remote_url`] | `origin` URL of a folder |

pub mod command_builder;


use crate::constants::{GIT_CLONE_TIMEOUT, GIT_LS_REMOTE_TIMEOUT};
use crate::core::WamError;
use anyhow::Result;
use command_builder::GitCommand;
use std::path::Path;

/// Clones the default branch of `url` into `dest` with depth 1.
///
/// `dest` must not exist or be empty.
pub async fn shallow_clone(url: &str, dest: &Path) -> bool {
    let result = GitCommand::shallow_clone(url, dest)
        .with_timeout(Some(GIT_CLONE_TIMEOUT))
        .with_context(repo_name_from_url(url))
        .execute_success()
        .await;

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target: "git", "Clone of {} failed: {:#}", strip_auth_from_url(url), e);
            false
        }
    }
}

/// Commit hash the remote's `HEAD` points at.
pub async fn remote_head(url: &str) -> Option<String> {
    let result = GitCommand::ls_remote_head(url)
        .with_timeout(Some(GIT_LS_REMOTE_TIMEOUT))
        .execute_stdout()
        .await;

    match result {
        Ok(stdout) => {
            let hash = stdout.lines().next()?.split_whitespace().next()?.to_string();
            is_commit_hash(&hash).then_some(hash)
        }
        Err(e) => {
            tracing::warn!(target: "git", "ls-remote {} failed: {:#}", strip_auth_from_url(url), e);
            None
        }
    }
}

/// Commit hash checked out in `path`, if it is a git work tree.
pub async fn local_head(path: &Path) -> Option<String> {
    if !is_valid_git_repo(path) {
        return None;
    }
    match GitCommand::current_commit().current_dir(path).execute_stdout().await {
        Ok(hash) if is_commit_hash(&hash) => Some(hash),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(target: "git", "rev-parse in {} failed: {:#}", path.display(), e);
            None
        }
    }
}

/// The `origin` remote of the work tree at `path`.
pub async fn remote_url(path: &Path) -> Option<String> {
    if !is_valid_git_repo(path) {
        return None;
    }
    match GitCommand::remote_url().current_dir(path).execute_stdout().await {
        Ok(url) if !url.is_empty() => Some(url),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(target: "git", "No origin in {}: {:#}", path.display(), e);
            None
        }
    }
}

#[must_use]
pub fn is_git_installed() -> bool {
    crate::utils::platform::command_exists(crate::utils::platform::get_git_command())
}

pub fn ensure_git_available() -> Result<()> {
    if !is_git_installed() {
        return Err(WamError::GitNotFound.into());
    }
    Ok(())
}

/// Whether `path` has a `.git` directory or file.
#[must_use]
pub fn is_valid_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// The last path segment of a clone URL without `.git`.
///
/// `https://github.com/user/RepoAddon.git` becomes `RepoAddon`.
#[must_use]
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    segment.strip_suffix(".git").unwrap_or(segment).to_string()
}

fn is_commit_hash(s: &str) -> bool {
    s.len() >= 7 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Removes `user:token@` from HTTP(S) URLs for logging.
#[must_use]
pub fn strip_auth_from_url(url: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            let host_end = rest.find('/').unwrap_or(rest.len());
            if let Some(at_pos) = rest[..host_end].rfind('@') {
                return format!("{scheme}{}", &rest[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}

/// Whether two commit hashes name the same commit.
///
/// A short hash matches the full hash it abbreviates; empty strings never match.
#[must_use]
pub fn hashes_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_ascii_lowercase();
    let b = b.trim().to_ascii_lowercase();
    !a.is_empty() && !b.is_empty() && (a.starts_with(&b) || b.starts_with(&a))
}
