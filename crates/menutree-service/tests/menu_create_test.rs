//! Menu creation and path derivation.

mod helpers;

use menutree_entity::menu::{MenuInput, ParentPath};
use menutree_service::MenuError;
use uuid::Uuid;

use helpers::{LockCall, TestApp, input_with_action};

#[tokio::test]
async fn test_root_child_grandchild_paths() {
    let app = TestApp::new();

    let root = app.create("System", None).await;
    let child = app.create("Users", Some(&root)).await;
    let grandchild = app.create("Roles", Some(&child)).await;

    assert!(root.parent_path.is_root());
    assert_eq!(child.parent_path.as_str(), root.id.to_string());
    assert_eq!(
        grandchild.parent_path.as_str(),
        format!("{}/{}", root.id, child.id)
    );
    app.assert_paths_consistent().await;
}

#[tokio::test]
async fn test_create_returns_related_and_creator() {
    let app = TestApp::new();

    let menu = app
        .service
        .create(&app.ctx, input_with_action("Reports", None, "export"))
        .await
        .unwrap();

    assert_eq!(menu.actions.len(), 1);
    assert_eq!(menu.actions[0].code, "export");
    assert_eq!(menu.creator, Some(Uuid::from_u128(0xabc)));
    assert_eq!(app.stored(menu.id).await, menu);
}

#[tokio::test]
async fn test_create_under_missing_parent_leaves_store_unchanged() {
    let app = TestApp::new();
    app.create("System", None).await;
    let before = app.snapshot().await;

    let ghost = menutree_core::types::MenuId::from_uuid(Uuid::from_u128(0xdead));
    let err = app
        .service
        .create(&app.ctx, MenuInput::named("Orphan", Some(ghost)))
        .await
        .unwrap_err();

    assert!(matches!(err, MenuError::InvalidParent(p) if p == ghost));
    assert_eq!(app.snapshot().await, before);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_store_access() {
    let app = TestApp::new();

    let err = app
        .service
        .create(&app.ctx, MenuInput::named("", None))
        .await
        .unwrap_err();

    assert!(matches!(err, MenuError::Validation(_)));
    assert_eq!(app.provider.begins(), 0);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_duplicate_action_codes_rejected() {
    let app = TestApp::new();
    let mut input = input_with_action("Users", None, "add");
    input.actions.push(input.actions[0].clone());

    let err = app.service.create(&app.ctx, input).await.unwrap_err();
    assert!(matches!(err, MenuError::Validation(_)));
    assert_eq!(app.provider.begins(), 0);
}

#[tokio::test]
async fn test_cancelled_create_writes_nothing() {
    let app = TestApp::new();
    let ctx = menutree_service::RequestContext::system();
    ctx.cancel();

    let err = app
        .service
        .create(&ctx, MenuInput::named("Late", None))
        .await
        .unwrap_err();

    assert!(matches!(err, MenuError::Cancelled));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_path_is_built_from_persisted_parent() {
    let app = TestApp::new();
    let root = app.create("System", None).await;
    let child = app.create("Users", Some(&root)).await;

    let created = app.create("Audit", Some(&child)).await;
    assert_eq!(created.parent_path, child.child_path());
    assert_eq!(created.parent_path, ParentPath::from_ids(&[root.id, child.id]));
    assert_eq!(created.parent_path.depth(), 2);
}

#[tokio::test]
async fn test_create_locks_parent_ancestors_before_parent() {
    let app = TestApp::new();
    let root = app.create("System", None).await;
    let child = app.create("Users", Some(&root)).await;
    app.provider.clear_locks();

    app.create("Roles", Some(&child)).await;

    assert_eq!(
        app.provider.locks(),
        vec![LockCall::Shared(vec![root.id]), LockCall::Exclusive(child.id)]
    );
}

#[tokio::test]
async fn test_root_create_takes_no_locks() {
    let app = TestApp::new();
    app.create("System", None).await;
    assert!(app.provider.locks().is_empty());
}
