//! Platform-specific utilities and cross-platform compatibility helpers
//!
//! WAM runs on Windows, macOS and Linux. The game client is usually installed
//! under `Program Files` on Windows, so long-path handling and `%VAR%` style
//! expansion matter there; on Unix-like systems the helpers are mostly
//! pass-through.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wam_cli::utils::platform::{get_home_dir, resolve_path};
//!
//! # fn example() -> anyhow::Result<()> {
//! let home = get_home_dir()?;
//! let addons = resolve_path("~/Games/World of Warcraft/_retail_/Interface/AddOns")?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Returns true when compiled for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the current user's home directory.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Name of the git executable for this platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}

/// Returns true if `cmd` can be found on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Expands `~/` and environment variables in a user supplied path.
///
/// Both `$VAR` and, on Windows, `%VAR%` forms are expanded. Unknown variables
/// are an error rather than being left in place.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = if let Some(stripped) = path.strip_prefix("~/") {
        get_home_dir()?.join(stripped)
    } else if path == "~" {
        get_home_dir()?
    } else if path.starts_with('~') {
        return Err(anyhow::anyhow!(
            "Invalid path: {path}\n\n\
            Tilde expansion only supports '~/' for the home directory."
        ));
    } else {
        PathBuf::from(path)
    };

    let path_str = expanded.to_string_lossy().into_owned();

    let path_str = if is_windows() && path_str.contains('%') {
        expand_percent_vars(&path_str)
    } else {
        path_str
    };

    let expanded = shellexpand::env(&path_str)
        .map_err(|e| anyhow::anyhow!("Failed to expand environment variables in {path}: {e}"))?;

    Ok(PathBuf::from(expanded.as_ref()))
}

fn expand_percent_vars(input: &str) -> String {
    let re = match regex::Regex::new(r"%([^%]+)%") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

/// Adds the `\\?\` prefix to paths longer than 260 characters on Windows.
#[cfg(windows)]
pub fn windows_long_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path_str.len() > 260 && !path_str.starts_with(r"\\?\") {
        let absolute_path = if path.is_relative() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(path)
        } else {
            path.to_path_buf()
        };

        let absolute_str = absolute_path.to_string_lossy();
        if absolute_str.len() > 260 {
            if let Some(stripped) = absolute_str.strip_prefix(r"\\") {
                PathBuf::from(format!(r"\\?\UNC\{}", stripped))
            } else {
                PathBuf::from(format!(r"\\?\{}", absolute_str))
            }
        } else {
            absolute_path
        }
    } else {
        path.to_path_buf()
    }
}

#[cfg(not(windows))]
#[must_use]
pub fn windows_long_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
