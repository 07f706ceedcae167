//! PostgreSQL menu store.

mod sql;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use menutree_core::error::AppError;
use menutree_core::result::AppResult;
use menutree_core::types::{MenuId, PageResponse};
use menutree_entity::menu::{Menu, MenuQueryOptions, MenuQueryParam, ParentPath};

use crate::connection::DatabasePool;
use crate::store::{MenuStore, MenuTransaction, TransactionProvider};

use self::sql::db_error;

/// Menu store backed by a PostgreSQL pool.
///
/// Also acts as the transaction provider: [`begin`](TransactionProvider::begin)
/// opens a database transaction on a dedicated pooled connection.
#[derive(Debug, Clone)]
pub struct PgMenuStore {
    pool: PgPool,
}

impl PgMenuStore {
    /// Create a new store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new store from a managed [`DatabasePool`].
    pub fn from_database(db: &DatabasePool) -> Self {
        Self::new(db.pool().clone())
    }

    async fn acquire(&self) -> AppResult<sqlx::pool::PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))
    }

    async fn begin_raw(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))
    }
}

#[async_trait]
impl MenuStore for PgMenuStore {
    async fn get(&self, id: MenuId, options: &MenuQueryOptions) -> AppResult<Option<Menu>> {
        let mut conn = self.acquire().await?;
        sql::fetch_menu(&mut conn, id, options).await
    }

    async fn query(
        &self,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> AppResult<PageResponse<Menu>> {
        let mut conn = self.acquire().await?;
        sql::query_menus(&mut conn, params, options).await
    }

    async fn create(&self, menu: &Menu) -> AppResult<()> {
        let mut tx = self.begin_raw().await?;
        sql::insert_menu(&mut tx, menu).await?;
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit menu creation", e))
    }

    async fn update(&self, id: MenuId, menu: &Menu) -> AppResult<()> {
        let mut tx = self.begin_raw().await?;
        sql::update_menu(&mut tx, id, menu).await?;
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit menu update", e))
    }

    async fn update_parent_path(&self, id: MenuId, path: &ParentPath) -> AppResult<()> {
        let mut conn = self.acquire().await?;
        sql::update_parent_path(&mut conn, id, path).await
    }

    async fn delete(&self, id: MenuId) -> AppResult<bool> {
        let mut conn = self.acquire().await?;
        sql::delete_menu(&mut conn, id).await
    }
}

#[async_trait]
impl TransactionProvider for PgMenuStore {
    async fn begin(&self) -> AppResult<Box<dyn MenuTransaction>> {
        let tx = self.begin_raw().await?;
        debug!("Menu transaction started");
        Ok(Box::new(PgMenuTransaction {
            tx: Mutex::new(Some(tx)),
        }))
    }
}

/// An open PostgreSQL transaction exposed through the menu store contract.
///
/// The connection sits behind an async mutex because store methods take
/// `&self`; statements on one transaction are serialized.
pub struct PgMenuTransaction {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl std::fmt::Debug for PgMenuTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgMenuTransaction").finish_non_exhaustive()
    }
}

fn finished() -> AppError {
    AppError::internal("Menu transaction already finished")
}

#[async_trait]
impl MenuStore for PgMenuTransaction {
    async fn get(&self, id: MenuId, options: &MenuQueryOptions) -> AppResult<Option<Menu>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::fetch_menu(tx, id, options).await
    }

    async fn query(
        &self,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> AppResult<PageResponse<Menu>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::query_menus(tx, params, options).await
    }

    async fn create(&self, menu: &Menu) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::insert_menu(tx, menu).await
    }

    async fn update(&self, id: MenuId, menu: &Menu) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::update_menu(tx, id, menu).await
    }

    async fn update_parent_path(&self, id: MenuId, path: &ParentPath) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::update_parent_path(tx, id, path).await
    }

    async fn delete(&self, id: MenuId) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::delete_menu(tx, id).await
    }
}

#[async_trait]
impl MenuTransaction for PgMenuTransaction {
    async fn lock(&self, id: MenuId) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::lock_menu(tx, id).await
    }

    async fn lock_shared(&self, ids: &[MenuId]) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        sql::lock_menus_shared(tx, ids).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let tx = self.tx.into_inner().ok_or_else(finished)?;
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        debug!("Menu transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let tx = self.tx.into_inner().ok_or_else(finished)?;
        tx.rollback()
            .await
            .map_err(|e| db_error("Failed to roll back transaction", e))?;
        debug!("Menu transaction rolled back");
        Ok(())
    }
}
