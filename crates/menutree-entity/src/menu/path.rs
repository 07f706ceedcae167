//! Materialized ancestor paths.
//!
//! A [`ParentPath`] lists the ids of every ancestor of a menu, root first,
//! joined by [`PATH_SEPARATOR`]. Root menus carry the empty path. The path
//! handed to the children of a menu is that menu's own path joined with its
//! id, so every descendant's path starts with it.

use std::fmt;

use menutree_core::types::MenuId;
use serde::{Deserialize, Serialize};

/// Separator between ancestor ids.
pub const PATH_SEPARATOR: char = '/';

/// Ordered ancestor ids of a menu, serialized as `id/id/id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ParentPath(String);

impl ParentPath {
    /// The path of a root menu.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Wrap a stored path value without re-validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build a path from ancestor ids, root first.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a MenuId>) -> Self {
        ids.into_iter()
            .fold(Self::root(), |path, id| path.join(*id))
    }

    /// Whether this is the empty path of a root menu.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The serialized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Append `id`, producing the path carried by the children of the menu
    /// whose path is `self` and whose id is `id`.
    pub fn join(&self, id: MenuId) -> Self {
        if self.0.is_empty() {
            Self(id.to_string())
        } else {
            Self(format!("{}{PATH_SEPARATOR}{id}", self.0))
        }
    }

    /// Whether `id` is one of the ancestors on this path.
    pub fn contains(&self, id: MenuId) -> bool {
        let needle = id.to_string();
        self.segments().any(|segment| segment == needle)
    }

    /// Whether this path equals `prefix` or lies beneath it.
    ///
    /// Matching is segment-aligned: `a/bc` is not within `a/b`.
    pub fn is_within(&self, prefix: &ParentPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
            None => false,
        }
    }

    /// Replace the leading `from` portion of this path with `to`, keeping the
    /// remainder. Returns `None` when the path is not within `from`.
    pub fn rebase(&self, from: &ParentPath, to: &ParentPath) -> Option<ParentPath> {
        if !self.is_within(from) {
            return None;
        }
        let rest = &self.0[from.0.len()..];
        if to.is_root() {
            return Some(Self(
                rest.trim_start_matches(PATH_SEPARATOR).to_string(),
            ));
        }
        if from.is_root() && !rest.is_empty() {
            return Some(Self(format!("{}{PATH_SEPARATOR}{rest}", to.0)));
        }
        Some(Self(format!("{}{rest}", to.0)))
    }

    /// Parse the ancestor ids, root first.
    pub fn ancestors(&self) -> Result<Vec<MenuId>, uuid::Error> {
        self.segments().map(str::parse).collect()
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ParentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ParentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
