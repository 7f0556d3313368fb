//! Test utilities for WAM
//!
//! Helpers shared by unit tests and the integration suite (enabled there through
//! the `test-utils` feature):
//!
//! - [`fixtures`] - zip archives, add-on folders and local git repositories
//! - [`doubles`] - an event recorder, a scripted source client and a copier
//!   that fails on demand
//! - [`TestEnvironment`] - a destination, repository and settings in one
//!   temporary directory, ready to hand out a
//!   [`CommandContext`](crate::commands::CommandContext)
//!
//! # Example
//!
//! ```rust,no_run
//! use wam_cli::test_utils::TestEnvironment;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let env = TestEnvironment::new().await?;
//! let ctx = env.context()?;
//! assert!(ctx.repository.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod doubles;
pub mod environment;
pub mod fixtures;

pub use doubles::{FailingCopier, FixtureClient, RecordingSink};
pub use environment::TestEnvironment;
pub use fixtures::{GitFixture, write_addon, write_zip};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Installs a test-friendly subscriber once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`. Without either, tests run
/// without log output.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
