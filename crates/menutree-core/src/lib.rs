//! # menutree-core
//!
//! Core crate for MenuTree. Contains configuration schemas, typed
//! identifiers, pagination types, the identifier-generation seam,
//! tracing initialisation, and the unified error system.
//!
//! This crate has **no** internal dependencies on other MenuTree crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
