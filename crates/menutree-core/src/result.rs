//! Convenience result type alias for MenuTree.

use crate::error::AppError;

/// A specialized `Result` type for MenuTree operations.
///
/// Stores and infrastructure code return this so that every crate does not
/// need to write `Result<T, AppError>` explicitly.
pub type AppResult<T> = Result<T, AppError>;
