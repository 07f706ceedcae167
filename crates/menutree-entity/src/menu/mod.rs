//! Menu domain entities.

pub mod model;
pub mod path;
pub mod query;
pub mod tree;

pub use model::{Menu, MenuAction, MenuInput, MenuResource};
pub use path::{PATH_SEPARATOR, ParentPath};
pub use query::{MenuQueryOptions, MenuQueryParam, ParentFilter};
pub use tree::MenuTree;
