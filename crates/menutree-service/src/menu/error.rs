//! Menu tree errors.

use thiserror::Error;

use menutree_core::error::AppError;
use menutree_core::types::MenuId;

/// Errors returned by [`MenuService`](super::MenuService).
#[derive(Debug, Error)]
pub enum MenuError {
    /// No menu has the given id.
    #[error("Menu {0} not found")]
    NotFound(MenuId),

    /// The declared parent does not exist.
    #[error("Parent menu {0} does not exist")]
    InvalidParent(MenuId),

    /// A menu named itself as its parent.
    #[error("A menu cannot be its own parent")]
    NotAllowSelf,

    /// A menu was moved beneath one of its own descendants.
    #[error("A menu cannot be moved beneath its own descendant")]
    NotAllowDescendant,

    /// The menu still has direct children.
    #[error("Menu has {children} child menu(s) and cannot be deleted")]
    NotAllowDelete {
        /// Number of direct children.
        children: u64,
    },

    /// The submitted input was rejected.
    #[error("Invalid menu input: {0}")]
    Validation(String),

    /// The caller cancelled the operation.
    #[error("Menu operation was cancelled")]
    Cancelled,

    /// Store or transaction failure.
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<MenuError> for AppError {
    fn from(err: MenuError) -> Self {
        let message = err.to_string();
        match err {
            MenuError::Store(inner) => inner,
            MenuError::NotFound(_) => AppError::not_found(message),
            MenuError::InvalidParent(_)
            | MenuError::NotAllowSelf
            | MenuError::NotAllowDescendant
            | MenuError::Validation(_) => AppError::validation(message),
            MenuError::NotAllowDelete { .. } => AppError::conflict(message),
            MenuError::Cancelled => AppError::cancelled(message),
        }
    }
}
