//! Integration test suite for WAM
//!
//! End-to-end tests against the public API and the `wam` binary. Everything
//! runs against temporary directories, local zip archives and local git
//! repositories, so no test touches the network.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `wam` binary driven through `assert_cmd`
//! - **lifecycle**: install, update and remove through the library API
//! - **batch**: update-all and check-all through the orchestrator

mod batch;
mod cli;
mod lifecycle;
