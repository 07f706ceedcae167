//! PostgreSQL store round trips.
//!
//! These need a disposable database:
//! `MENUTREE_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::Utc;
use uuid::Uuid;

use menutree_core::config::DatabaseConfig;
use menutree_core::types::MenuId;
use menutree_database::{DatabasePool, MenuStore, PgMenuStore, TransactionProvider};
use menutree_entity::menu::{
    Menu, MenuAction, MenuInput, MenuQueryOptions, MenuQueryParam, MenuResource, ParentPath,
};

async fn connect() -> PgMenuStore {
    let url = std::env::var("MENUTREE_TEST_DATABASE_URL")
        .expect("MENUTREE_TEST_DATABASE_URL must be set");
    let config = DatabaseConfig {
        url,
        max_connections: 4,
        min_connections: 1,
        connect_timeout_seconds: 5,
        idle_timeout_seconds: 60,
        run_migrations: true,
    };
    let db = DatabasePool::connect(&config)
        .await
        .expect("Failed to connect to test database");
    PgMenuStore::from_database(&db)
}

fn menu(name: &str, parent: Option<&Menu>) -> Menu {
    let now = Utc::now();
    let mut input = MenuInput::named(name, parent.map(|p| p.id));
    input.actions = vec![MenuAction {
        code: "query".to_string(),
        name: "Query".to_string(),
    }];
    input.resources = vec![MenuResource {
        code: "list".to_string(),
        name: "List".to_string(),
        method: "GET".to_string(),
        path: format!("/api/v1/{}", name.to_lowercase()),
    }];
    let path = parent.map(Menu::child_path).unwrap_or_else(ParentPath::root);
    input.into_menu(MenuId::new(), path, Some(Uuid::new_v4()), now, now)
}

#[tokio::test]
#[ignore]
async fn test_create_get_with_related() {
    let store = connect().await;
    let root = menu("Settings", None);
    store.create(&root).await.unwrap();

    let loaded = store
        .get(root.id, &MenuQueryOptions::with_related())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.actions, root.actions);
    assert_eq!(loaded.resources, root.resources);

    let bare = store
        .get(root.id, &MenuQueryOptions::unpaged())
        .await
        .unwrap()
        .unwrap();
    assert!(bare.actions.is_empty());

    assert!(store.delete(root.id).await.unwrap());
    assert!(!store.delete(root.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_prefix_query_and_rollback() {
    let store = connect().await;
    let root = menu("Root", None);
    let child = menu("Child", Some(&root));
    let grandchild = menu("Grandchild", Some(&child));
    for m in [&root, &child, &grandchild] {
        store.create(m).await.unwrap();
    }

    let subtree = store
        .query(
            &MenuQueryParam::within(root.child_path()),
            &MenuQueryOptions::unpaged(),
        )
        .await
        .unwrap();
    assert_eq!(subtree.total_items, 2);

    let tx = store.begin().await.unwrap();
    assert!(tx.lock(child.id).await.unwrap());
    tx.update_parent_path(grandchild.id, &ParentPath::root())
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let unchanged = store
        .get(grandchild.id, &MenuQueryOptions::unpaged())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.parent_path, child.child_path());

    for id in [grandchild.id, child.id, root.id] {
        store.delete(id).await.unwrap();
    }
}

#[tokio::test]
#[ignore]
async fn test_shared_lock_blocks_exclusive_lock() {
    let store = connect().await;
    let root = menu("Shared", None);
    store.create(&root).await.unwrap();

    let reader = store.begin().await.unwrap();
    reader.lock_shared(&[root.id, MenuId::new()]).await.unwrap();

    let second_reader = store.begin().await.unwrap();
    second_reader.lock_shared(&[root.id]).await.unwrap();
    second_reader.rollback().await.unwrap();

    let writer = store.begin().await.unwrap();
    let id = root.id;
    let handle = tokio::spawn(async move {
        let found = writer.lock(id).await.unwrap();
        writer.rollback().await.unwrap();
        found
    });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!handle.is_finished(), "exclusive lock must wait for the shared holder");

    reader.rollback().await.unwrap();
    assert!(handle.await.unwrap());

    store.delete(root.id).await.unwrap();
}
