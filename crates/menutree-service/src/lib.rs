//! # menutree-service
//!
//! Tree maintenance for menu records kept in a flat store. [`MenuService`]
//! derives each menu's materialized ancestor path, rewrites whole subtrees
//! when a menu moves, and refuses to delete menus that still have children.
//!
//! Services follow constructor injection: the record store, the
//! transaction provider and the id generator are handed in as `Arc`s.

pub mod context;
pub mod menu;

pub use context::RequestContext;
pub use menu::{MenuError, MenuService, compute_parent_path};
