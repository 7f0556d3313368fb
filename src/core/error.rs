//! Error handling for WAM
//!
//! This module provides the error types and user-friendly error reporting for the
//! WAM add-on manager. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`WamError`] - Enumerated error types for failures raised inside WAM
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Expected outcomes that callers branch on (a catalog reporting "not found", a
//! missing API key, an add-on that is already up to date) are *not* modelled here.
//! They are tagged result types owned by the module that produces them, see
//! [`crate::source::ResolveError`] and [`crate::commands::CommandError`].
//! `WamError` is reserved for genuinely exceptional conditions: failed downloads,
//! corrupt archives, I/O faults and the like. Commands convert these into a
//! failure result at their boundary after running their compensating `undo`.
//!
//! # Error Conversion
//!
//! Common library errors are automatically converted:
//! - [`std::io::Error`] → [`WamError::IoError`]
//! - [`toml::de::Error`] → [`WamError::TomlError`]
//! - [`serde_json::Error`] → [`WamError::JsonError`]
//!
//! Use [`user_friendly_error`] to convert any error into a user-friendly format with
//! contextual suggestions.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wam_cli::core::{WamError, ErrorContext};
//!
//! let error = WamError::NotConfigured;
//! let context = ErrorContext::new(error)
//!     .with_suggestion("Set `destination` in ~/.wam/config.toml");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for WAM operations
///
/// Each variant represents a specific failure mode and carries the paths, URLs
/// and reasons needed to explain it to a user.
///
/// # Error Categories
///
/// - **Git**: [`GitNotFound`], [`GitCommandError`], [`GitCloneFailed`]
/// - **Configuration**: [`NotConfigured`], [`ConfigError`], [`UnsupportedSource`]
/// - **Archives**: [`DownloadFailed`], [`ExtractionFailed`], [`PathTraversal`],
///   [`NoInstallableFolders`]
/// - **Repository**: [`DuplicateAddon`], [`AddonNotFound`], [`StoreParseError`],
///   [`StoreVersionUnsupported`]
/// - **System**: [`FileSystemError`], [`PermissionDenied`], [`IoError`]
///
/// [`GitNotFound`]: WamError::GitNotFound
/// [`GitCommandError`]: WamError::GitCommandError
/// [`GitCloneFailed`]: WamError::GitCloneFailed
/// [`NotConfigured`]: WamError::NotConfigured
/// [`ConfigError`]: WamError::ConfigError
/// [`UnsupportedSource`]: WamError::UnsupportedSource
/// [`DownloadFailed`]: WamError::DownloadFailed
/// [`ExtractionFailed`]: WamError::ExtractionFailed
/// [`PathTraversal`]: WamError::PathTraversal
/// [`NoInstallableFolders`]: WamError::NoInstallableFolders
/// [`DuplicateAddon`]: WamError::DuplicateAddon
/// [`AddonNotFound`]: WamError::AddonNotFound
/// [`StoreParseError`]: WamError::StoreParseError
/// [`StoreVersionUnsupported`]: WamError::StoreVersionUnsupported
/// [`FileSystemError`]: WamError::FileSystemError
/// [`PermissionDenied`]: WamError::PermissionDenied
/// [`IoError`]: WamError::IoError
#[derive(Error, Debug)]
pub enum WamError {
    /// Git operation failed during execution
    ///
    /// This error occurs when a git command returns a non-zero exit code or
    /// times out.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "clone", "ls-remote")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// Git repository clone failed
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL that failed to clone
        url: String,
        /// The reason for the clone failure
        reason: String,
    },

    /// The add-on destination folder has not been configured
    ///
    /// Every command that touches the destination checks this first and fails
    /// fast instead of guessing a location.
    #[error("The add-on destination folder is not configured")]
    NotConfigured,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// A URL or identifier that no source client understands
    #[error("Unsupported add-on source: {input}")]
    UnsupportedSource {
        /// The URL or identifier as given by the user
        input: String,
    },

    /// Downloading an add-on archive failed
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed {
        /// The artifact URL
        url: String,
        /// Why the download failed
        reason: String,
    },

    /// Extracting an add-on archive failed
    #[error("Failed to extract archive {archive}: {reason}")]
    ExtractionFailed {
        /// Path of the archive on disk
        archive: String,
        /// Why extraction failed
        reason: String,
    },

    /// An archive entry would be written outside of the extraction directory
    #[error("Archive entry '{entry}' escapes the extraction directory")]
    PathTraversal {
        /// The raw entry name as stored in the archive
        entry: String,
    },

    /// A staged artifact did not contain any add-on folder
    #[error("No installable add-on folder found in {source_name}")]
    NoInstallableFolders {
        /// The URL or identifier the artifact came from
        source_name: String,
    },

    /// An add-on record with the same folder already exists
    #[error("Add-on '{folder}' is already tracked")]
    DuplicateAddon {
        /// The folder that is already present in the repository
        folder: String,
    },

    /// No add-on record exists for the folder
    #[error("Add-on '{folder}' is not tracked")]
    AddonNotFound {
        /// The folder that was looked up
        folder: String,
    },

    /// The persisted add-on table could not be parsed
    #[error("Invalid add-on store syntax in {file}")]
    StoreParseError {
        /// Path to the store file
        file: String,
        /// Parser message
        reason: String,
    },

    /// The persisted add-on table was written by a newer WAM
    #[error("Add-on store {file} has version {found}, newer than supported version {supported}")]
    StoreVersionUnsupported {
        /// Path to the store file
        file: String,
        /// Version found on disk
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// File system error
    #[error("File system error: {operation}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// The operation that was denied due to insufficient permissions
        operation: String,
        /// Path where permission was denied
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for WamError {
    fn clone(&self) -> Self {
        match self {
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCloneFailed {
                url,
                reason,
            } => Self::GitCloneFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::NotConfigured => Self::NotConfigured,
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::UnsupportedSource {
                input,
            } => Self::UnsupportedSource {
                input: input.clone(),
            },
            Self::DownloadFailed {
                url,
                reason,
            } => Self::DownloadFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::ExtractionFailed {
                archive,
                reason,
            } => Self::ExtractionFailed {
                archive: archive.clone(),
                reason: reason.clone(),
            },
            Self::PathTraversal {
                entry,
            } => Self::PathTraversal {
                entry: entry.clone(),
            },
            Self::NoInstallableFolders {
                source_name,
            } => Self::NoInstallableFolders {
                source_name: source_name.clone(),
            },
            Self::DuplicateAddon {
                folder,
            } => Self::DuplicateAddon {
                folder: folder.clone(),
            },
            Self::AddonNotFound {
                folder,
            } => Self::AddonNotFound {
                folder: folder.clone(),
            },
            Self::StoreParseError {
                file,
                reason,
            } => Self::StoreParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::StoreVersionUnsupported {
                file,
                found,
                supported,
            } => Self::StoreVersionUnsupported {
                file: file.clone(),
                found: *found,
                supported: *supported,
            },
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            Self::PermissionDenied {
                operation,
                path,
            } => Self::PermissionDenied {
                operation: operation.clone(),
                path: path.clone(),
            },
            // Library errors are not Clone; keep their message
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::TomlSerError(e) => Self::Other {
                message: format!("TOML serialization error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps a [`WamError`] with an optional suggestion (what to do next) and
/// optional details (why it happened). Used by the CLI to render failures.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: WamError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: WamError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into a user-friendly [`ErrorContext`].
///
/// Known [`WamError`] variants and common I/O failures receive tailored
/// suggestions; anything else is rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(wam_error) = error.downcast_ref::<WamError>() {
        return create_error_context(wam_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(WamError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the game folder is writable by your user")
                .with_details("WAM needs write access to the AddOns folder and its own state directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(WamError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the configured destination folder exists");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(WamError::Other {
        message,
    })
}

fn create_error_context(error: WamError) -> ErrorContext {
    match &error {
        WamError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ or your package manager (e.g., 'brew install git', 'apt install git')")
            .with_details("Add-ons installed from a git host are cloned with the system git command"),

        WamError::GitCloneFailed { url, .. } => {
            let suggestion = format!(
                "Verify the repository URL is correct: {url}. Check your internet connection and repository access"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Clone operations can fail due to invalid URLs, network issues, or access restrictions")
        }

        WamError::NotConfigured => ErrorContext::new(error)
            .with_suggestion("Set `destination` in ~/.wam/config.toml to your Interface/AddOns folder")
            .with_details("WAM never guesses where to install add-ons"),

        WamError::UnsupportedSource { .. } => ErrorContext::new(error)
            .with_suggestion("Use a git repository URL, a WoWInterface download page, a Tukui add-on page or a Wago add-on page"),

        WamError::PathTraversal { .. } => ErrorContext::new(error)
            .with_suggestion("Do not install this archive; report it to the add-on author")
            .with_details("The archive tried to write files outside of the add-on folder and was rejected"),

        WamError::NoInstallableFolders { .. } => ErrorContext::new(error)
            .with_details("An add-on folder must contain a .toc manifest file"),

        WamError::StoreParseError { file, .. } => {
            let suggestion = format!(
                "Fix the syntax in {file}, or delete it and run 'wam scan' to rebuild it from disk"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        WamError::StoreVersionUnsupported { .. } => ErrorContext::new(error)
            .with_suggestion("Upgrade wam to the latest version to read this add-on store"),

        WamError::PermissionDenied { operation, path } => {
            let details = format!("Cannot {operation} due to insufficient permissions on {path}");
            ErrorContext::new(error)
                .with_suggestion(match cfg!(windows) {
                    true => "Run as Administrator or check file permissions in File Explorer",
                    false => "Check file permissions with 'ls -la'",
                })
                .with_details(details)
        }

        _ => ErrorContext::new(error),
    }
}
