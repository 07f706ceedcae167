//! Shared helpers for menu service tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use menutree_core::error::AppError;
use menutree_core::result::AppResult;
use menutree_core::traits::IdGenerator;
use menutree_core::types::{MenuId, PageResponse};
use menutree_database::{MemoryMenuStore, MenuStore, MenuTransaction, TransactionProvider};
use menutree_entity::menu::{
    Menu, MenuAction, MenuInput, MenuQueryOptions, MenuQueryParam, ParentPath,
};
use menutree_service::{MenuService, RequestContext};

/// Deterministic ids: 1, 2, 3, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> MenuId {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        MenuId::from_uuid(Uuid::from_u128(u128::from(n)))
    }
}

/// A lock taken through [`MenuTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCall {
    Shared(Vec<MenuId>),
    Exclusive(MenuId),
}

/// Transaction provider over a memory store that records how it is used and
/// can inject faults into descendant rewrites.
#[derive(Debug)]
pub struct RecordingProvider {
    inner: MemoryMenuStore,
    begins: AtomicUsize,
    locks: Arc<Mutex<Vec<LockCall>>>,
    /// Fail the n-th `update_parent_path` call (1-based) of each transaction.
    fail_rewrite: Option<usize>,
    /// Cancel this token right after the first descendant rewrite.
    cancel_on_rewrite: Option<CancellationToken>,
}

impl RecordingProvider {
    pub fn new(inner: MemoryMenuStore) -> Self {
        Self {
            inner,
            begins: AtomicUsize::new(0),
            locks: Arc::new(Mutex::new(Vec::new())),
            fail_rewrite: None,
            cancel_on_rewrite: None,
        }
    }

    pub fn failing_rewrite(mut self, nth: usize) -> Self {
        self.fail_rewrite = Some(nth);
        self
    }

    pub fn cancelling_on_rewrite(mut self, token: CancellationToken) -> Self {
        self.cancel_on_rewrite = Some(token);
        self
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Every lock taken so far, in order, across all transactions.
    pub fn locks(&self) -> Vec<LockCall> {
        self.locks.lock().unwrap().clone()
    }

    pub fn clear_locks(&self) {
        self.locks.lock().unwrap().clear();
    }
}

#[async_trait]
impl TransactionProvider for RecordingProvider {
    async fn begin(&self) -> AppResult<Box<dyn MenuTransaction>> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.begin().await?;
        Ok(Box::new(RecordingTransaction {
            inner,
            locks: self.locks.clone(),
            rewrites: AtomicUsize::new(0),
            fail_rewrite: self.fail_rewrite,
            cancel_on_rewrite: self.cancel_on_rewrite.clone(),
        }))
    }
}

#[derive(Debug)]
struct RecordingTransaction {
    inner: Box<dyn MenuTransaction>,
    locks: Arc<Mutex<Vec<LockCall>>>,
    rewrites: AtomicUsize,
    fail_rewrite: Option<usize>,
    cancel_on_rewrite: Option<CancellationToken>,
}

#[async_trait]
impl MenuStore for RecordingTransaction {
    async fn get(&self, id: MenuId, options: &MenuQueryOptions) -> AppResult<Option<Menu>> {
        self.inner.get(id, options).await
    }

    async fn query(
        &self,
        params: &MenuQueryParam,
        options: &MenuQueryOptions,
    ) -> AppResult<PageResponse<Menu>> {
        self.inner.query(params, options).await
    }

    async fn create(&self, menu: &Menu) -> AppResult<()> {
        self.inner.create(menu).await
    }

    async fn update(&self, id: MenuId, menu: &Menu) -> AppResult<()> {
        self.inner.update(id, menu).await
    }

    async fn update_parent_path(&self, id: MenuId, path: &ParentPath) -> AppResult<()> {
        let n = self.rewrites.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_rewrite == Some(n) {
            return Err(AppError::database(format!("injected failure on rewrite {n}")));
        }
        self.inner.update_parent_path(id, path).await?;
        if let Some(token) = &self.cancel_on_rewrite {
            token.cancel();
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    async fn delete(&self, id: MenuId) -> AppResult<bool> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl MenuTransaction for RecordingTransaction {
    async fn lock(&self, id: MenuId) -> AppResult<bool> {
        self.locks.lock().unwrap().push(LockCall::Exclusive(id));
        self.inner.lock(id).await
    }

    async fn lock_shared(&self, ids: &[MenuId]) -> AppResult<()> {
        self.locks.lock().unwrap().push(LockCall::Shared(ids.to_vec()));
        self.inner.lock_shared(ids).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}

/// A menu service wired to a fresh memory store.
pub struct TestApp {
    pub store: MemoryMenuStore,
    pub provider: Arc<RecordingProvider>,
    pub service: MenuService,
    pub ctx: RequestContext,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(RecordingProvider::new)
    }

    pub fn with_provider(build: impl FnOnce(MemoryMenuStore) -> RecordingProvider) -> Self {
        let store = MemoryMenuStore::new();
        let provider = Arc::new(build(store.clone()));
        let service = MenuService::new(
            Arc::new(store.clone()),
            provider.clone(),
            Arc::new(SequentialIds::default()),
        );
        Self {
            store,
            provider,
            service,
            ctx: RequestContext::new(Some(Uuid::from_u128(0xabc))),
        }
    }

    /// Create a menu through the service.
    pub async fn create(&self, name: &str, parent: Option<&Menu>) -> Menu {
        self.service
            .create(&self.ctx, MenuInput::named(name, parent.map(|p| p.id)))
            .await
            .expect("Failed to create menu")
    }

    /// Read a menu straight from the store.
    pub async fn stored(&self, id: MenuId) -> Menu {
        self.store
            .get(id, &MenuQueryOptions::with_related())
            .await
            .expect("store read failed")
            .expect("menu missing")
    }

    /// Snapshot of every record keyed by id.
    pub async fn snapshot(&self) -> HashMap<MenuId, Menu> {
        self.store
            .snapshot()
            .await
            .into_iter()
            .map(|m| (m.id, m))
            .collect()
    }

    /// Assert that every stored path equals its parent's path joined with the
    /// parent's id.
    pub async fn assert_paths_consistent(&self) {
        let all = self.snapshot().await;
        for menu in all.values() {
            let expected = match menu.parent_id {
                None => ParentPath::root(),
                Some(parent) => all[&parent].child_path(),
            };
            assert_eq!(
                menu.parent_path, expected,
                "menu {} has an inconsistent parent path",
                menu.name
            );
            assert!(!menu.parent_path.contains(menu.id));
        }
    }
}

/// An input carrying one action.
pub fn input_with_action(name: &str, parent: Option<MenuId>, action: &str) -> MenuInput {
    let mut input = MenuInput::named(name, parent);
    input.actions = vec![MenuAction {
        code: action.to_string(),
        name: action.to_uppercase(),
    }];
    input
}
