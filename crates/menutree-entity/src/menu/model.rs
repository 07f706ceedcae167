//! Menu entity model.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use menutree_core::types::MenuId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::path::ParentPath;

/// A menu entry in the navigation hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Menu {
    /// Unique menu identifier.
    pub id: MenuId,
    /// Display name.
    pub name: String,
    /// Sort weight; higher values sort first.
    pub sequence: i32,
    /// Icon identifier.
    pub icon: String,
    /// Front-end route.
    pub router: String,
    /// Whether the menu is hidden from navigation.
    pub hidden: bool,
    /// Parent menu ID (null for root menus).
    pub parent_id: Option<MenuId>,
    /// Materialized ancestor path (empty for root menus).
    pub parent_path: ParentPath,
    /// The user who created the menu.
    pub creator: Option<Uuid>,
    /// When the menu was created.
    pub created_at: DateTime<Utc>,
    /// When the menu was last updated.
    pub updated_at: DateTime<Utc>,
    /// Actions exposed by the menu (only populated when requested).
    #[sqlx(skip)]
    #[serde(default)]
    pub actions: Vec<MenuAction>,
    /// Backend resources guarded by the menu (only populated when requested).
    #[sqlx(skip)]
    #[serde(default)]
    pub resources: Vec<MenuResource>,
}

impl Menu {
    /// Check if this is a root menu (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The path carried by this menu's direct children.
    pub fn child_path(&self) -> ParentPath {
        self.parent_path.join(self.id)
    }
}

/// An operation a menu exposes (e.g. `add`, `edit`, `del`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Validate)]
pub struct MenuAction {
    /// Action code, unique within its menu.
    #[validate(length(min = 1, max = 100))]
    pub code: String,
    /// Display name.
    #[validate(length(max = 100))]
    pub name: String,
}

/// A backend endpoint a menu grants access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Validate)]
pub struct MenuResource {
    /// Resource code, unique within its menu.
    #[validate(length(min = 1, max = 100))]
    pub code: String,
    /// Display name.
    #[validate(length(max = 100))]
    pub name: String,
    /// HTTP method.
    #[validate(length(max = 16))]
    pub method: String,
    /// Request path.
    #[validate(length(max = 255))]
    pub path: String,
}

/// Caller-supplied fields for creating or updating a menu.
///
/// Identity and tree position (`id`, `parent_path`) are always derived by
/// the service and never accepted from callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct MenuInput {
    /// Display name.
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    /// Sort weight.
    #[serde(default)]
    pub sequence: i32,
    /// Icon identifier.
    #[serde(default)]
    #[validate(length(max = 255))]
    pub icon: String,
    /// Front-end route.
    #[serde(default)]
    #[validate(length(max = 255))]
    pub router: String,
    /// Whether the menu is hidden.
    #[serde(default)]
    pub hidden: bool,
    /// Parent menu ID (None for a root menu).
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    /// Actions to attach.
    #[serde(default)]
    #[validate(nested, custom(function = "unique_action_codes"))]
    pub actions: Vec<MenuAction>,
    /// Resources to attach.
    #[serde(default)]
    #[validate(nested, custom(function = "unique_resource_codes"))]
    pub resources: Vec<MenuResource>,
}

impl MenuInput {
    /// Shorthand for a bare menu with a name and optional parent.
    pub fn named(name: impl Into<String>, parent_id: Option<MenuId>) -> Self {
        Self {
            name: name.into(),
            parent_id,
            ..Self::default()
        }
    }

    /// Assemble the stored record once identity and position are known.
    pub fn into_menu(
        self,
        id: MenuId,
        parent_path: ParentPath,
        creator: Option<Uuid>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Menu {
        Menu {
            id,
            name: self.name,
            sequence: self.sequence,
            icon: self.icon,
            router: self.router,
            hidden: self.hidden,
            parent_id: self.parent_id,
            parent_path,
            creator,
            created_at,
            updated_at,
            actions: self.actions,
            resources: self.resources,
        }
    }
}

#[allow(clippy::ptr_arg)]
fn unique_action_codes(actions: &Vec<MenuAction>) -> Result<(), ValidationError> {
    unique_codes(actions.iter().map(|a| a.code.as_str()))
}

#[allow(clippy::ptr_arg)]
fn unique_resource_codes(resources: &Vec<MenuResource>) -> Result<(), ValidationError> {
    unique_codes(resources.iter().map(|r| r.code.as_str()))
}

fn unique_codes<'a>(codes: impl Iterator<Item = &'a str>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for code in codes {
        if !seen.insert(code) {
            let mut err = ValidationError::new("duplicate_code");
            err.message = Some(format!("code '{code}' appears more than once").into());
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(code: &str) -> MenuAction {
        MenuAction {
            code: code.to_string(),
            name: code.to_uppercase(),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let mut input = MenuInput::named("Settings", None);
        input.actions = vec![action("add"), action("edit")];
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let input = MenuInput::named("", None);
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_duplicate_action_codes_rejected() {
        let mut input = MenuInput::named("Users", None);
        input.actions = vec![action("add"), action("add")];
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_empty_resource_code_rejected() {
        let mut input = MenuInput::named("Users", None);
        input.resources = vec![MenuResource {
            code: String::new(),
            name: "Query users".to_string(),
            method: "GET".to_string(),
            path: "/api/v1/users".to_string(),
        }];
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_into_menu_keeps_payload() {
        let parent = MenuId::new();
        let id = MenuId::new();
        let now = Utc::now();
        let mut input = MenuInput::named("Roles", Some(parent));
        input.sequence = 9;
        input.actions = vec![action("query")];

        let menu = input.into_menu(id, ParentPath::root().join(parent), None, now, now);
        assert_eq!(menu.id, id);
        assert_eq!(menu.sequence, 9);
        assert_eq!(menu.parent_id, Some(parent));
        assert_eq!(menu.child_path(), ParentPath::from_ids(&[parent, id]));
        assert_eq!(menu.actions.len(), 1);
    }
}
