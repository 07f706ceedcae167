//! Record-store and unit-of-work contracts for menu records.

use async_trait::async_trait;

use menutree_core::result::AppResult;
use menutree_core::types::{MenuId, PageResponse};
use menutree_entity::menu::{Menu, MenuQueryOptions, MenuQueryParam, ParentPath};

/// CRUD and filtered queries over menu records.
///
/// Implementations own persistence only. They never derive or repair
/// `parent_path`; callers hand them finished records.
#[async_trait]
pub trait MenuStore: Send + Sync + std::fmt::Debug {
    /// Fetch one menu. Related collections follow `options`.
    async fn get(&self, id: MenuId, options: &MenuQueryOptions) -> AppResult<Option<Menu>>;

    /// Filtered query, ordered by `sequence DESC, created_at ASC`.
    ///
    /// With `options.page == None` every match is returned and
    /// `total_items` is exact.
    async fn query(
        &self,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> AppResult<PageResponse<Menu>>;

    /// Insert a menu together with its actions and resources.
    async fn create(&self, menu: &Menu) -> AppResult<()>;

    /// Overwrite the payload, parent fields, actions and resources of `id`.
    async fn update(&self, id: MenuId, menu: &Menu) -> AppResult<()>;

    /// Overwrite only the `parent_path` of `id`.
    async fn update_parent_path(&self, id: MenuId, path: &ParentPath) -> AppResult<()>;

    /// Remove `id` and its related rows. Returns whether a record existed.
    async fn delete(&self, id: MenuId) -> AppResult<bool>;
}

/// A store handle scoped to one open transaction.
///
/// Reads observe the transaction's own earlier writes. Dropping the handle
/// without calling [`commit`](MenuTransaction::commit) rolls it back.
#[async_trait]
pub trait MenuTransaction: MenuStore {
    /// Lock `id` against concurrent writers until the transaction ends.
    /// Returns whether the record exists.
    async fn lock(&self, id: MenuId) -> AppResult<bool>;

    /// Lock `ids` against concurrent [`lock`](MenuTransaction::lock) until
    /// the transaction ends, without excluding other shared holders.
    /// Missing ids are skipped.
    async fn lock_shared(&self, ids: &[MenuId]) -> AppResult<()>;

    /// Make every write visible atomically.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Opens transactions against a store.
#[async_trait]
pub trait TransactionProvider: Send + Sync + std::fmt::Debug {
    /// Begin a new transaction.
    async fn begin(&self) -> AppResult<Box<dyn MenuTransaction>>;
}
