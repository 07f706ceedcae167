//! Core type definitions used across the MenuTree workspace.

pub mod id;
pub mod pagination;

pub use id::MenuId;
pub use pagination::{PageRequest, PageResponse};
