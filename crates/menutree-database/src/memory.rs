//! In-process menu store.
//!
//! Records live in a `BTreeMap` behind an async mutex. A transaction takes
//! the mutex for its whole lifetime and works on a staged copy of the table,
//! so transactions are fully serialized and a dropped transaction leaves the
//! table untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use menutree_core::error::AppError;
use menutree_core::result::AppResult;
use menutree_core::types::{MenuId, PageResponse};
use menutree_entity::menu::{Menu, MenuQueryOptions, MenuQueryParam, ParentFilter, ParentPath};

use crate::store::{MenuStore, MenuTransaction, TransactionProvider};

#[derive(Debug, Clone, Default)]
struct MenuTable {
    rows: BTreeMap<MenuId, Menu>,
}

impl MenuTable {
    fn get(&self, id: MenuId, options: &MenuQueryOptions) -> Option<Menu> {
        self.rows.get(&id).map(|menu| shape(menu, options))
    }

    fn query(&self, params: &MenuQueryParam, options: &MenuQueryOptions) -> PageResponse<Menu> {
        let mut matched: Vec<&Menu> = self.rows.values().filter(|m| matches(params, m)).collect();
        matched.sort_by(|a, b| {
            b.sequence
                .cmp(&a.sequence)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        match options.page {
            None => PageResponse::unpaged(matched.into_iter().map(|m| shape(m, options)).collect()),
            Some(page) => {
                let total = matched.len() as u64;
                let items = matched
                    .into_iter()
                    .skip(page.offset() as usize)
                    .take(page.limit() as usize)
                    .map(|m| shape(m, options))
                    .collect();
                PageResponse::new(items, page.page, page.page_size, total)
            }
        }
    }

    fn create(&mut self, menu: &Menu) -> AppResult<()> {
        if self.rows.contains_key(&menu.id) {
            return Err(AppError::conflict(format!("Menu {} already exists", menu.id)));
        }
        self.rows.insert(menu.id, menu.clone());
        Ok(())
    }

    fn update(&mut self, id: MenuId, menu: &Menu) -> AppResult<()> {
        let row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Menu {id} not found")))?;
        *row = Menu {
            id,
            creator: row.creator,
            created_at: row.created_at,
            ..menu.clone()
        };
        Ok(())
    }

    fn update_parent_path(&mut self, id: MenuId, path: &ParentPath) -> AppResult<()> {
        let row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Menu {id} not found")))?;
        row.parent_path = path.clone();
        Ok(())
    }

    fn delete(&mut self, id: MenuId) -> bool {
        self.rows.remove(&id).is_some()
    }
}

fn matches(params: &MenuQueryParam, menu: &Menu) -> bool {
    if let Some(ids) = &params.record_ids {
        if !ids.contains(&menu.id) {
            return false;
        }
    }
    if let Some(name) = &params.name {
        if &menu.name != name {
            return false;
        }
    }
    if let Some(term) = &params.like_name {
        if !menu.name.to_lowercase().contains(&term.to_lowercase()) {
            return false;
        }
    }
    match params.parent {
        Some(ParentFilter::Root) if menu.parent_id.is_some() => return false,
        Some(ParentFilter::Of(parent)) if menu.parent_id != Some(parent) => return false,
        _ => {}
    }
    if let Some(prefix) = &params.prefix_parent_path {
        if !menu.parent_path.is_within(prefix) {
            return false;
        }
    }
    if let Some(hidden) = params.hidden {
        if menu.hidden != hidden {
            return false;
        }
    }
    true
}

fn shape(menu: &Menu, options: &MenuQueryOptions) -> Menu {
    let mut menu = menu.clone();
    if !options.include_actions {
        menu.actions.clear();
    }
    if !options.include_resources {
        menu.resources.clear();
    }
    menu
}

/// Menu store held entirely in memory.
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryMenuStore {
    table: Arc<Mutex<MenuTable>>,
}

impl MemoryMenuStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored menus.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    /// Whether the store holds no menus.
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.rows.is_empty()
    }

    /// Copy of every stored menu (with related collections), ordered by id.
    pub async fn snapshot(&self) -> Vec<Menu> {
        self.table.lock().await.rows.values().cloned().collect()
    }
}

#[async_trait]
impl MenuStore for MemoryMenuStore {
    async fn get(&self, id: MenuId, options: &MenuQueryOptions) -> AppResult<Option<Menu>> {
        Ok(self.table.lock().await.get(id, options))
    }

    async fn query(
        &self,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> AppResult<PageResponse<Menu>> {
        Ok(self.table.lock().await.query(params, options))
    }

    async fn create(&self, menu: &Menu) -> AppResult<()> {
        self.table.lock().await.create(menu)
    }

    async fn update(&self, id: MenuId, menu: &Menu) -> AppResult<()> {
        self.table.lock().await.update(id, menu)
    }

    async fn update_parent_path(&self, id: MenuId, path: &ParentPath) -> AppResult<()> {
        self.table.lock().await.update_parent_path(id, path)
    }

    async fn delete(&self, id: MenuId) -> AppResult<bool> {
        Ok(self.table.lock().await.delete(id))
    }
}

#[async_trait]
impl TransactionProvider for MemoryMenuStore {
    async fn begin(&self) -> AppResult<Box<dyn MenuTransaction>> {
        let guard = Arc::clone(&self.table).lock_owned().await;
        let staged = guard.clone();
        debug!("Memory menu transaction started");
        Ok(Box::new(MemoryMenuTransaction {
            state: Mutex::new(TxState { guard, staged }),
        }))
    }
}

#[derive(Debug)]
struct TxState {
    guard: OwnedMutexGuard<MenuTable>,
    staged: MenuTable,
}

/// A serialized transaction over a [`MemoryMenuStore`].
#[derive(Debug)]
pub struct MemoryMenuTransaction {
    state: Mutex<TxState>,
}

#[async_trait]
impl MenuStore for MemoryMenuTransaction {
    async fn get(&self, id: MenuId, options: &MenuQueryOptions) -> AppResult<Option<Menu>> {
        Ok(self.state.lock().await.staged.get(id, options))
    }

    async fn query(
        &self,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> AppResult<PageResponse<Menu>> {
        Ok(self.state.lock().await.staged.query(params, options))
    }

    async fn create(&self, menu: &Menu) -> AppResult<()> {
        self.state.lock().await.staged.create(menu)
    }

    async fn update(&self, id: MenuId, menu: &Menu) -> AppResult<()> {
        self.state.lock().await.staged.update(id, menu)
    }

    async fn update_parent_path(&self, id: MenuId, path: &ParentPath) -> AppResult<()> {
        self.state.lock().await.staged.update_parent_path(id, path)
    }

    async fn delete(&self, id: MenuId) -> AppResult<bool> {
        Ok(self.state.lock().await.staged.delete(id))
    }
}

#[async_trait]
impl MenuTransaction for MemoryMenuTransaction {
    async fn lock(&self, id: MenuId) -> AppResult<bool> {
        Ok(self.state.lock().await.staged.rows.contains_key(&id))
    }

    // The whole table is already held exclusively.
    async fn lock_shared(&self, _ids: &[MenuId]) -> AppResult<()> {
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let TxState { mut guard, staged } = self.state.into_inner();
        *guard = staged;
        debug!("Memory menu transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        debug!("Memory menu transaction rolled back");
        Ok(())
    }
}
