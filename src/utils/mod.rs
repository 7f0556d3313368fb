//! Cross-platform utilities for WAM
//!
//! - [`fs`] - directory copy/removal, atomic writes, RAII temp directories
//! - [`platform`] - platform detection, git command lookup, path expansion
//! - [`progress`] - indicatif progress bars and the CLI event sink

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, copy_dir, ensure_dir, remove_dir_all, replace_dir};
pub use platform::{get_git_command, get_home_dir, is_windows, resolve_path};
pub use progress::{ProgressBar, ProgressSink};
