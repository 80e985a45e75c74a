//! flashpack-core
//!
//! Core library for packaging separately compiled firmware sections into one
//! factory flash image that can be written to a device starting at address zero.
//!
//! A build runs strictly in sequence: the locator resolves the section list,
//! the validator checks it against the files on disk, the composer merges it
//! into a single image, and the publisher stages the results under
//! board/version-stamped names.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! the CLI or from another build orchestrator.

pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod services;

pub use error::{PackError, PackResult};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
