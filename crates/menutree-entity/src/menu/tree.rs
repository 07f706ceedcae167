//! Nested menu trees for hierarchical display.

use std::collections::{HashMap, HashSet};

use menutree_core::types::MenuId;
use serde::{Deserialize, Serialize};

use super::model::Menu;

/// A menu together with its nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuTree {
    /// The menu at this node.
    #[serde(flatten)]
    pub menu: Menu,
    /// Child menu nodes, in input order.
    pub children: Vec<MenuTree>,
}

impl MenuTree {
    /// Assemble a forest from a flat list of menus.
    ///
    /// A menu becomes a root when it has no parent or when its parent is not
    /// part of `menus`. Siblings keep their relative input order.
    pub fn forest(menus: Vec<Menu>) -> Vec<MenuTree> {
        let present: HashSet<MenuId> = menus.iter().map(|m| m.id).collect();
        let mut roots = Vec::new();
        let mut by_parent: HashMap<MenuId, Vec<Menu>> = HashMap::new();

        for menu in menus {
            match menu.parent_id {
                Some(parent) if present.contains(&parent) => {
                    by_parent.entry(parent).or_default().push(menu);
                }
                _ => roots.push(menu),
            }
        }

        roots
            .into_iter()
            .map(|menu| Self::attach(menu, &mut by_parent))
            .collect()
    }

    fn attach(menu: Menu, by_parent: &mut HashMap<MenuId, Vec<Menu>>) -> MenuTree {
        let children = by_parent
            .remove(&menu.id)
            .unwrap_or_default()
            .into_iter()
            .map(|child| Self::attach(child, by_parent))
            .collect();
        MenuTree { menu, children }
    }

    /// Number of menus in this subtree, including this node.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(MenuTree::len).sum::<usize>()
    }

    /// Always false; a tree node holds at least its own menu.
    pub fn is_empty(&self) -> bool {
        false
    }
}
