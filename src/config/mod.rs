//! Configuration module
//!
//! Loads and validates the volumes and styles files that drive a build.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
