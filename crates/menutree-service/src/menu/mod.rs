//! Menu tree maintenance.

pub mod error;
pub mod service;

pub use error::MenuError;
pub use service::{MenuService, compute_parent_path};
