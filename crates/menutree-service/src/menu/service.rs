//! Menu tree maintenance over a flat record store.
//!
//! Every menu stores its ancestor ids as a materialized [`ParentPath`]. This
//! service is the only place that derives or repairs those paths: it computes
//! the path on create, rewrites the whole subtree on a move, and refuses to
//! delete menus that still have children. Multi-record mutations run inside
//! one store transaction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use validator::Validate;

use menutree_core::error::{AppError, ErrorKind};
use menutree_core::traits::{IdGenerator, RandomIdGenerator};
use menutree_core::types::{MenuId, PageResponse};
use menutree_database::{MenuStore, MenuTransaction, TransactionProvider};
use menutree_entity::menu::{
    Menu, MenuInput, MenuQueryOptions, MenuQueryParam, MenuTree, ParentPath,
};

use super::error::MenuError;
use crate::context::RequestContext;

/// Maintains the materialized paths of the menu tree.
#[derive(Debug, Clone)]
pub struct MenuService {
    /// Record store for reads outside a transaction.
    store: Arc<dyn MenuStore>,
    /// Opens transactions for multi-record mutations.
    transactions: Arc<dyn TransactionProvider>,
    /// Identifier source for new menus.
    ids: Arc<dyn IdGenerator>,
}

/// Derive the path carried by a child of `parent_id`.
///
/// Reads the parent through `store`, which must be the transaction handle
/// when called inside one. A missing parent yields
/// [`MenuError::InvalidParent`].
pub async fn compute_parent_path<S>(
    store: &S,
    parent_id: Option<MenuId>,
) -> Result<ParentPath, MenuError>
where
    S: MenuStore + ?Sized,
{
    let Some(parent_id) = parent_id else {
        return Ok(ParentPath::root());
    };

    let parent = store
        .get(parent_id, &MenuQueryOptions::bare())
        .await?
        .ok_or(MenuError::InvalidParent(parent_id))?;

    let path = parent.child_path();
    debug!(parent_id = %parent_id, parent_path = %path, "Computed parent path");
    Ok(path)
}

impl MenuService {
    /// Creates a new menu service.
    pub fn new(
        store: Arc<dyn MenuStore>,
        transactions: Arc<dyn TransactionProvider>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            transactions,
            ids,
        }
    }

    /// Creates a service over a store that also provides its own
    /// transactions, generating random ids.
    pub fn over<S>(store: Arc<S>) -> Self
    where
        S: MenuStore + TransactionProvider + 'static,
    {
        Self::new(store.clone(), store, Arc::new(RandomIdGenerator))
    }

    /// Filtered, optionally paged listing.
    pub async fn query(
        &self,
        ctx: &RequestContext,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> Result<PageResponse<Menu>, MenuError> {
        cancellable(ctx, "query", async {
            self.store
                .query(params, options)
                .await
                .map_err(MenuError::from)
        })
        .await
    }

    /// Fetch one menu.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: MenuId,
        options: &MenuQueryOptions,
    ) -> Result<Menu, MenuError> {
        cancellable(ctx, "get", async {
            self.store
                .get(id, options)
                .await?
                .ok_or(MenuError::NotFound(id))
        })
        .await
    }

    /// Create a menu beneath `input.parent_id` (or as a root).
    ///
    /// Returns the stored record with actions and resources loaded.
    pub async fn create(&self, ctx: &RequestContext, input: MenuInput) -> Result<Menu, MenuError> {
        validate(&input)?;

        let menu = cancellable(ctx, "create", async {
            let tx = self.transactions.begin().await?;
            let outcome = self.create_in(tx.as_ref(), ctx, input).await;
            finish(tx, outcome).await
        })
        .await?;

        info!(
            user_id = ?ctx.user_id,
            menu_id = %menu.id,
            parent_id = ?menu.parent_id,
            parent_path = %menu.parent_path,
            "Menu created"
        );

        Ok(menu)
    }

    async fn create_in(
        &self,
        tx: &dyn MenuTransaction,
        ctx: &RequestContext,
        input: MenuInput,
    ) -> Result<Menu, MenuError> {
        if let Some(parent_id) = input.parent_id {
            if lock_with_ancestors(tx, parent_id).await?.is_none() {
                return Err(MenuError::InvalidParent(parent_id));
            }
        }

        let parent_path = compute_parent_path(tx, input.parent_id).await?;
        let id = self.ids.generate();
        let now = Utc::now();
        let menu = input.into_menu(id, parent_path, ctx.user_id, now, now);

        tx.create(&menu).await?;
        fetch_with_related(tx, id).await
    }

    /// Replace the payload of `id` and, when `input.parent_id` differs from
    /// the stored parent, move it together with its whole subtree.
    ///
    /// Returns the stored record with actions and resources loaded.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: MenuId,
        input: MenuInput,
    ) -> Result<Menu, MenuError> {
        if input.parent_id == Some(id) {
            return Err(MenuError::NotAllowSelf);
        }
        validate(&input)?;

        let menu = cancellable(ctx, "update", async {
            let tx = self.transactions.begin().await?;
            let outcome = self.update_in(tx.as_ref(), id, input).await;
            finish(tx, outcome).await
        })
        .await?;

        info!(
            user_id = ?ctx.user_id,
            menu_id = %id,
            parent_id = ?menu.parent_id,
            "Menu updated"
        );

        Ok(menu)
    }

    async fn update_in(
        &self,
        tx: &dyn MenuTransaction,
        id: MenuId,
        input: MenuInput,
    ) -> Result<Menu, MenuError> {
        let old = lock_with_ancestors(tx, id)
            .await?
            .ok_or(MenuError::NotFound(id))?;

        let mut parent_path = old.parent_path.clone();
        if input.parent_id != old.parent_id {
            if let Some(parent_id) = input.parent_id {
                if lock_with_ancestors(tx, parent_id).await?.is_none() {
                    return Err(MenuError::InvalidParent(parent_id));
                }
            }

            parent_path = compute_parent_path(tx, input.parent_id).await?;
            if parent_path.contains(id) {
                return Err(MenuError::NotAllowDescendant);
            }

            let old_full = old.child_path();
            let new_full = parent_path.join(id);
            let moved = rewrite_subtree(tx, &old_full, &new_full).await?;

            info!(
                menu_id = %id,
                from = %old_full,
                to = %new_full,
                descendants = moved,
                "Menu subtree moved"
            );
        }

        let menu = input.into_menu(id, parent_path, old.creator, old.created_at, Utc::now());
        tx.update(id, &menu).await?;
        fetch_with_related(tx, id).await
    }

    /// Delete a childless menu together with its actions and resources.
    pub async fn delete(&self, ctx: &RequestContext, id: MenuId) -> Result<(), MenuError> {
        cancellable(ctx, "delete", async {
            let tx = self.transactions.begin().await?;
            let outcome = delete_in(tx.as_ref(), id).await;
            finish(tx, outcome).await
        })
        .await?;

        info!(user_id = ?ctx.user_id, menu_id = %id, "Menu deleted");
        Ok(())
    }

    /// Nested view of every menu matching `params`.
    ///
    /// Menus whose parent is not part of the result become roots of the
    /// returned forest.
    pub async fn tree(
        &self,
        ctx: &RequestContext,
        params: &MenuQueryParam,
    ) -> Result<Vec<MenuTree>, MenuError> {
        let page = self.query(ctx, params, &MenuQueryOptions::unpaged()).await?;
        Ok(MenuTree::forest(page.items))
    }

    /// Ancestors of `id`, root first.
    pub async fn ancestors(&self, ctx: &RequestContext, id: MenuId) -> Result<Vec<Menu>, MenuError> {
        let menu = self.get(ctx, id, &MenuQueryOptions::bare()).await?;
        let ids = path_ids(&menu)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = self
            .query(ctx, &MenuQueryParam::ids(ids.clone()), &MenuQueryOptions::unpaged())
            .await?;
        let mut by_id: HashMap<MenuId, Menu> =
            found.items.into_iter().map(|m| (m.id, m)).collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

/// Attempts before a path that keeps moving under us is reported as a
/// conflict.
const LOCK_ATTEMPTS: usize = 3;

/// Lock `id` for writing after share-locking every ancestor on its path.
///
/// A concurrent move of any ancestor holds that ancestor exclusively, so it
/// either finishes before the share locks are granted or waits for this
/// transaction to end. The path is re-read under the locks; if it changed in
/// between, the ancestors along the new path are locked again.
///
/// Returns `None` when `id` does not exist.
async fn lock_with_ancestors(
    tx: &dyn MenuTransaction,
    id: MenuId,
) -> Result<Option<Menu>, MenuError> {
    for attempt in 1..=LOCK_ATTEMPTS {
        let Some(seen) = tx.get(id, &MenuQueryOptions::bare()).await? else {
            return Ok(None);
        };
        tx.lock_shared(&path_ids(&seen)?).await?;
        if !tx.lock(id).await? {
            return Ok(None);
        }

        let Some(locked) = tx.get(id, &MenuQueryOptions::bare()).await? else {
            return Ok(None);
        };
        if locked.parent_path == seen.parent_path {
            return Ok(Some(locked));
        }
        debug!(
            menu_id = %id,
            attempt,
            from = %seen.parent_path,
            to = %locked.parent_path,
            "Path moved while locking, retrying"
        );
    }

    Err(AppError::conflict(format!(
        "Menu {id} kept moving while it was being locked"
    ))
    .into())
}

fn path_ids(menu: &Menu) -> Result<Vec<MenuId>, MenuError> {
    menu.parent_path.ancestors().map_err(|e| {
        MenuError::Store(AppError::with_source(
            ErrorKind::Internal,
            format!(
                "Menu {} has a malformed parent path '{}'",
                menu.id, menu.parent_path
            ),
            e,
        ))
    })
}

async fn delete_in(tx: &dyn MenuTransaction, id: MenuId) -> Result<(), MenuError> {
    if lock_with_ancestors(tx, id).await?.is_none() {
        return Err(MenuError::NotFound(id));
    }

    let children = tx
        .query(&MenuQueryParam::children_of(id), &MenuQueryOptions::unpaged())
        .await?;
    if children.total_items > 0 {
        return Err(MenuError::NotAllowDelete {
            children: children.total_items,
        });
    }

    if !tx.delete(id).await? {
        return Err(MenuError::NotFound(id));
    }
    Ok(())
}

/// Re-root every menu whose path lies within `old_full` onto `new_full`.
///
/// Returns the number of rewritten menus.
async fn rewrite_subtree<S>(
    store: &S,
    old_full: &ParentPath,
    new_full: &ParentPath,
) -> Result<usize, MenuError>
where
    S: MenuStore + ?Sized,
{
    let descendants = store
        .query(
            &MenuQueryParam::within(old_full.clone()),
            &MenuQueryOptions::unpaged(),
        )
        .await?;

    let mut rewritten = 0;
    for node in &descendants.items {
        let Some(path) = node.parent_path.rebase(old_full, new_full) else {
            continue;
        };
        debug!(
            menu_id = %node.id,
            from = %node.parent_path,
            to = %path,
            "Rewriting descendant path"
        );
        store.update_parent_path(node.id, &path).await?;
        rewritten += 1;
    }
    Ok(rewritten)
}

async fn fetch_with_related<S>(store: &S, id: MenuId) -> Result<Menu, MenuError>
where
    S: MenuStore + ?Sized,
{
    store
        .get(id, &MenuQueryOptions::with_related())
        .await?
        .ok_or(MenuError::NotFound(id))
}

fn validate(input: &MenuInput) -> Result<(), MenuError> {
    input
        .validate()
        .map_err(|e| MenuError::Validation(e.to_string()))
}

/// Commit on success; roll back on failure and return the original error.
async fn finish<T>(
    tx: Box<dyn MenuTransaction>,
    outcome: Result<T, MenuError>,
) -> Result<T, MenuError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    error = %rollback_err,
                    cause = %err,
                    "Failed to roll back menu transaction"
                );
            }
            Err(err)
        }
    }
}

async fn cancellable<T, F>(ctx: &RequestContext, operation: &'static str, fut: F) -> Result<T, MenuError>
where
    F: Future<Output = Result<T, MenuError>>,
{
    match ctx.run_until_cancelled(fut).await {
        Some(outcome) => outcome,
        None => {
            info!(operation, user_id = ?ctx.user_id, "Menu operation cancelled");
            Err(MenuError::Cancelled)
        }
    }
}
