//! File system utilities for cross-platform file operations
//!
//! Every function here is synchronous; async callers wrap bulk work in
//! `tokio::task::spawn_blocking`.

pub mod atomic;
pub mod dirs;
pub mod temp;

// Directory operations
pub use dirs::{
    copy_dir, ensure_dir, ensure_parent_dir, list_subdirectories, remove_dir_all,
    replace_dir, restore_dir,
};

// Atomic write operations
pub use atomic::atomic_write;

// Temporary directories
pub use temp::TempDir;
