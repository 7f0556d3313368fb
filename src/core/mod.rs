//! Core types and error handling for WAM
//!
//! This module hosts the error taxonomy shared by every other module. The add-on
//! data model itself lives in [`crate::models`].
//!
//! - [`WamError`] - strongly typed failures raised inside WAM
//! - [`ErrorContext`] / [`user_friendly_error`] - CLI rendering with suggestions

pub mod error;

pub use error::{ErrorContext, WamError, user_friendly_error};
