//! SQL shared by pooled and transactional handles.
//!
//! Every function takes a bare connection so the same statements run on a
//! pooled connection or inside an open transaction.

use std::collections::HashMap;

use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use menutree_core::error::{AppError, ErrorKind};
use menutree_core::result::AppResult;
use menutree_core::types::{MenuId, PageResponse};
use menutree_entity::menu::{
    Menu, MenuAction, MenuQueryOptions, MenuQueryParam, MenuResource, PATH_SEPARATOR,
    ParentFilter, ParentPath,
};

const MENU_COLUMNS: &str = "id, name, sequence, icon, router, hidden, parent_id, parent_path, \
                            creator, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ActionRow {
    menu_id: MenuId,
    code: String,
    name: String,
}

#[derive(Debug, FromRow)]
struct ResourceRow {
    menu_id: MenuId,
    code: String,
    name: String,
    method: String,
    path: String,
}

pub(crate) fn db_error(context: &str, err: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, format!("{context}: {err}"), err)
}

pub(crate) async fn fetch_menu(
    conn: &mut PgConnection,
    id: MenuId,
    options: &MenuQueryOptions,
) -> AppResult<Option<Menu>> {
    let menu = sqlx::query_as::<_, Menu>(&format!("SELECT {MENU_COLUMNS} FROM menus WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to find menu", e))?;

    let Some(menu) = menu else {
        return Ok(None);
    };
    let mut menus = vec![menu];
    load_related(conn, &mut menus, options).await?;
    Ok(menus.pop())
}

pub(crate) async fn query_menus(
    conn: &mut PgConnection,
    params: &MenuQueryParam,
    options: &MenuQueryOptions,
) -> AppResult<PageResponse<Menu>> {
    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {MENU_COLUMNS} FROM menus"));
    push_filters(&mut select, params);
    select.push(" ORDER BY sequence DESC, created_at ASC, id ASC");

    let Some(page) = options.page else {
        let mut menus = select
            .build_query_as::<Menu>()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to query menus", e))?;
        load_related(conn, &mut menus, options).await?;
        return Ok(PageResponse::unpaged(menus));
    };

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM menus");
    push_filters(&mut count, params);
    let total: i64 = count
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to count menus", e))?;

    select
        .push(" LIMIT ")
        .push_bind(page.limit() as i64)
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
    let mut menus = select
        .build_query_as::<Menu>()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to query menus", e))?;
    load_related(conn, &mut menus, options).await?;

    Ok(PageResponse::new(
        menus,
        page.page,
        page.page_size,
        total as u64,
    ))
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &MenuQueryParam) {
    qb.push(" WHERE TRUE");

    if let Some(ids) = &params.record_ids {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        qb.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(name) = &params.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(term) = &params.like_name {
        qb.push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(term)));
    }
    match params.parent {
        Some(ParentFilter::Root) => {
            qb.push(" AND parent_id IS NULL");
        }
        Some(ParentFilter::Of(parent_id)) => {
            qb.push(" AND parent_id = ").push_bind(parent_id);
        }
        None => {}
    }
    if let Some(prefix) = params.prefix_parent_path.as_ref().filter(|p| !p.is_root()) {
        qb.push(" AND (parent_path = ")
            .push_bind(prefix.as_str().to_owned())
            .push(" OR parent_path LIKE ")
            .push_bind(format!(
                "{}{PATH_SEPARATOR}%",
                escape_like(prefix.as_str())
            ))
            .push(")");
    }
    if let Some(hidden) = params.hidden {
        qb.push(" AND hidden = ").push_bind(hidden);
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

async fn load_related(
    conn: &mut PgConnection,
    menus: &mut [Menu],
    options: &MenuQueryOptions,
) -> AppResult<()> {
    if menus.is_empty() || !(options.include_actions || options.include_resources) {
        return Ok(());
    }
    let ids: Vec<Uuid> = menus.iter().map(|m| m.id.into_uuid()).collect();

    if options.include_actions {
        let rows = sqlx::query_as::<_, ActionRow>(
            "SELECT menu_id, code, name FROM menu_actions \
             WHERE menu_id = ANY($1) ORDER BY menu_id, position",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to load menu actions", e))?;

        let mut by_menu: HashMap<MenuId, Vec<MenuAction>> = HashMap::new();
        for row in rows {
            by_menu.entry(row.menu_id).or_default().push(MenuAction {
                code: row.code,
                name: row.name,
            });
        }
        for menu in menus.iter_mut() {
            menu.actions = by_menu.remove(&menu.id).unwrap_or_default();
        }
    }

    if options.include_resources {
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT menu_id, code, name, method, path FROM menu_resources \
             WHERE menu_id = ANY($1) ORDER BY menu_id, position",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to load menu resources", e))?;

        let mut by_menu: HashMap<MenuId, Vec<MenuResource>> = HashMap::new();
        for row in rows {
            by_menu.entry(row.menu_id).or_default().push(MenuResource {
                code: row.code,
                name: row.name,
                method: row.method,
                path: row.path,
            });
        }
        for menu in menus.iter_mut() {
            menu.resources = by_menu.remove(&menu.id).unwrap_or_default();
        }
    }

    Ok(())
}

pub(crate) async fn insert_menu(conn: &mut PgConnection, menu: &Menu) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO menus (id, name, sequence, icon, router, hidden, parent_id, parent_path, \
         creator, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(menu.id)
    .bind(&menu.name)
    .bind(menu.sequence)
    .bind(&menu.icon)
    .bind(&menu.router)
    .bind(menu.hidden)
    .bind(menu.parent_id)
    .bind(&menu.parent_path)
    .bind(menu.creator)
    .bind(menu.created_at)
    .bind(menu.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("menus_pkey") => {
            AppError::conflict(format!("Menu {} already exists", menu.id))
        }
        _ => db_error("Failed to create menu", e),
    })?;

    insert_related(conn, menu).await
}

pub(crate) async fn update_menu(conn: &mut PgConnection, id: MenuId, menu: &Menu) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE menus SET name = $2, sequence = $3, icon = $4, router = $5, hidden = $6, \
         parent_id = $7, parent_path = $8, updated_at = $9 WHERE id = $1",
    )
    .bind(id)
    .bind(&menu.name)
    .bind(menu.sequence)
    .bind(&menu.icon)
    .bind(&menu.router)
    .bind(menu.hidden)
    .bind(menu.parent_id)
    .bind(&menu.parent_path)
    .bind(menu.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to update menu", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Menu {id} not found")));
    }

    sqlx::query("DELETE FROM menu_actions WHERE menu_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to clear menu actions", e))?;
    sqlx::query("DELETE FROM menu_resources WHERE menu_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to clear menu resources", e))?;

    insert_related(conn, menu).await
}

async fn insert_related(conn: &mut PgConnection, menu: &Menu) -> AppResult<()> {
    if !menu.actions.is_empty() {
        let mut qb =
            QueryBuilder::<Postgres>::new("INSERT INTO menu_actions (menu_id, code, name, position) ");
        qb.push_values(menu.actions.iter().enumerate(), |mut row, (pos, action)| {
            row.push_bind(menu.id)
                .push_bind(action.code.clone())
                .push_bind(action.name.clone())
                .push_bind(pos as i32);
        });
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to store menu actions", e))?;
    }

    if !menu.resources.is_empty() {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO menu_resources (menu_id, code, name, method, path, position) ",
        );
        qb.push_values(menu.resources.iter().enumerate(), |mut row, (pos, resource)| {
            row.push_bind(menu.id)
                .push_bind(resource.code.clone())
                .push_bind(resource.name.clone())
                .push_bind(resource.method.clone())
                .push_bind(resource.path.clone())
                .push_bind(pos as i32);
        });
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to store menu resources", e))?;
    }

    Ok(())
}

pub(crate) async fn update_parent_path(
    conn: &mut PgConnection,
    id: MenuId,
    path: &ParentPath,
) -> AppResult<()> {
    let result = sqlx::query("UPDATE menus SET parent_path = $2 WHERE id = $1")
        .bind(id)
        .bind(path)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to update parent path", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Menu {id} not found")));
    }
    Ok(())
}

pub(crate) async fn delete_menu(conn: &mut PgConnection, id: MenuId) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM menus WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to delete menu", e))?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn lock_menu(conn: &mut PgConnection, id: MenuId) -> AppResult<bool> {
    let locked: Option<MenuId> = sqlx::query_scalar("SELECT id FROM menus WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to lock menu", e))?;
    Ok(locked.is_some())
}

pub(crate) async fn lock_menus_shared(conn: &mut PgConnection, ids: &[MenuId]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
    sqlx::query("SELECT id FROM menus WHERE id = ANY($1) ORDER BY id FOR SHARE")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to share-lock menus", e))?;
    Ok(())
}
