//! WAM - World of Warcraft Add-on Manager
//!
//! Installs, updates and removes add-ons in a game's `Interface/AddOns` folder
//! from four kinds of sources: git repositories, WoWInterface, Tukui and Wago.
//! What is installed is tracked in a small TOML repository next to the
//! configuration, so WAM knows which folders belong together and which
//! version each add-on is at.
//!
//! # Architecture Overview
//!
//! A release usually ships several folders. One of them is the *parent* (the
//! folder the add-on is tracked under); the others are *owned* by it and are
//! installed, updated and removed along with it. Folders that WAM did not
//! install are picked up by [`commands::ScanCommand`] as manual add-ons.
//!
//! Every change to the destination is a command object
//! ([`commands::AddonCommand`]) that knows how to undo itself. When a step
//! fails half way, [`commands::run`] reverts what was written, so a failed
//! update leaves the previous version in place byte for byte.
//!
//! # Core Modules
//!
//! - [`commands`] - install, update, remove and scan with undo
//! - [`orchestrator`] - update-all and check-all with bounded concurrency,
//!   plus settings backups
//! - [`repository`] - persisted add-on records guarded by a lock file
//! - [`ownership`] - picks the parent among the folders of a release
//! - [`source`] - catalog and git clients resolving remote metadata
//! - [`installer`] - staging, extraction and copying of releases
//! - [`manifest`] - `.toc` manifest parsing
//!
//! # Supporting Modules
//!
//! - [`config`] - user settings (`~/.wam/config.toml`)
//! - [`core`] - error types and user-facing error rendering
//! - [`events`] - progress events emitted by commands
//! - [`git`] - system `git` wrapper
//! - [`models`] - add-on records, sources, channels and flavors
//! - [`utils`] - file system helpers, platform quirks and progress display
//! - [`cli`] - the `wam` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wam_cli::commands::{self, CommandContext, InstallCommand};
//! use wam_cli::config::{ConfigStore, FileConfigStore};
//! use wam_cli::installer::Installer;
//! use wam_cli::repository::AddonRepository;
//! use wam_cli::source::{HttpClient, SourceRegistry};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Arc::new(FileConfigStore::load_default().await?);
//! let settings = config.get();
//! let repository = Arc::new(AddonRepository::open(settings.repository_file()?).await?);
//! let ctx = CommandContext::new(
//!     repository,
//!     SourceRegistry::from_settings(&settings)?,
//!     config,
//!     Installer::new(HttpClient::new()?),
//! );
//!
//! let mut install = InstallCommand::from_url("https://www.tukui.org/elvui");
//! let report = commands::run(&mut install, &ctx).await?;
//! println!("installed {}", report.parent);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod core;
pub mod events;
pub mod git;
pub mod installer;
pub mod manifest;
pub mod models;
pub mod orchestrator;
pub mod ownership;
pub mod repository;
pub mod source;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
