//! Query parameters and read-shape options for menu lookups.

use menutree_core::types::{MenuId, PageRequest};
use serde::{Deserialize, Serialize};

use super::path::ParentPath;

/// Filter on a menu's direct parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ParentFilter {
    /// Menus without a parent.
    Root,
    /// Direct children of the given menu.
    Of(MenuId),
}

/// Filter conditions for menu queries. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuQueryParam {
    /// Restrict to these ids.
    #[serde(default)]
    pub record_ids: Option<Vec<MenuId>>,
    /// Exact name match.
    #[serde(default)]
    pub name: Option<String>,
    /// Case-insensitive substring match on name.
    #[serde(default)]
    pub like_name: Option<String>,
    /// Direct parent filter.
    #[serde(default)]
    pub parent: Option<ParentFilter>,
    /// Segment-aligned prefix match on `parent_path`: selects every menu
    /// whose path equals this value or lies beneath it.
    #[serde(default)]
    pub prefix_parent_path: Option<ParentPath>,
    /// Hidden flag match.
    #[serde(default)]
    pub hidden: Option<bool>,
}

impl MenuQueryParam {
    /// Direct children of `id`.
    pub fn children_of(id: MenuId) -> Self {
        Self {
            parent: Some(ParentFilter::Of(id)),
            ..Self::default()
        }
    }

    /// Every menu in the subtree whose members carry `prefix` (at any depth).
    pub fn within(prefix: ParentPath) -> Self {
        Self {
            prefix_parent_path: Some(prefix),
            ..Self::default()
        }
    }

    /// The given ids.
    pub fn ids(ids: Vec<MenuId>) -> Self {
        Self {
            record_ids: Some(ids),
            ..Self::default()
        }
    }
}

/// Read-shape options: paging and eager loading of related collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuQueryOptions {
    /// Page to return; `None` returns every match with an exact total.
    #[serde(default)]
    pub page: Option<PageRequest>,
    /// Load each menu's actions.
    #[serde(default)]
    pub include_actions: bool,
    /// Load each menu's resources.
    #[serde(default)]
    pub include_resources: bool,
}

impl MenuQueryOptions {
    /// Unpaged, without related collections.
    pub fn unpaged() -> Self {
        Self::default()
    }

    /// Record columns only; for single-record reads where paging does not
    /// apply.
    pub fn bare() -> Self {
        Self::default()
    }

    /// Unpaged, with actions and resources.
    pub fn with_related() -> Self {
        Self {
            include_actions: true,
            include_resources: true,
            ..Self::default()
        }
    }

    /// Same options restricted to one page.
    pub fn paged(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }
}
