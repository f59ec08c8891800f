//! Stock (bookmark) endpoints
//!
//! Stocking is a toggle relation between the viewer and a note. Both
//! directions are idempotent; repeating a request is a silent success.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{notes, stocks, users};
use crate::relation;
use crate::user::Profile;
use crate::web::{offset_for, relation_error, require_visible_note, storage_error, PageOf, PageQuery};
use actix_web::{delete, error, get, put, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_stock)
        .service(create_stock)
        .service(delete_stock)
        .service(view_stockers);
}

/// Response for stock toggles and state reads
#[derive(Serialize)]
struct StockResponse {
    success: bool,
    /// Whether the caller now has the note stocked.
    stocked: bool,
    /// Whether this request changed anything.
    changed: bool,
    stock_count: i32,
}

#[get("/notes/{token}/stock")]
async fn view_stock(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = require_visible_note(&client, &token).await?;

    let stocked = match client.get_id() {
        Some(user_id) => relation::pair_exists::<stocks::Entity, _>(db, user_id, note.id)
            .await
            .map_err(storage_error)?,
        None => false,
    };

    Ok(HttpResponse::Ok().json(StockResponse {
        success: true,
        stocked,
        changed: false,
        stock_count: note.stock_count,
    }))
}

/// Stock a note (idempotent)
#[put("/notes/{token}/stock")]
async fn create_stock(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = require_visible_note(&client, &token).await?;

    let outcome = relation::ensure_exists::<stocks::Entity>(db, user_id, note.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(StockResponse {
        success: true,
        stocked: true,
        changed: outcome.created,
        stock_count: fresh_stock_count(db, note.id).await?,
    }))
}

/// Unstock a note (idempotent; absence is a silent success)
#[delete("/notes/{token}/stock")]
async fn delete_stock(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = crate::notes::find_by_token(db, &token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Note not found."))?;

    let outcome = relation::ensure_absent::<stocks::Entity>(db, user_id, note.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(StockResponse {
        success: true,
        stocked: false,
        changed: outcome.deleted,
        stock_count: fresh_stock_count(db, note.id).await?,
    }))
}

#[get("/notes/{token}/stockers")]
async fn view_stockers(
    client: ClientCtx,
    path: web::Path<(String,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();
    let (page, per_page) = query.clamp(20, 100);

    let note = require_visible_note(&client, &token).await?;

    let total = users::Entity::find()
        .join(JoinType::InnerJoin, users::Relation::Stocks.def())
        .filter(stocks::Column::NoteId.eq(note.id))
        .count(db)
        .await
        .map_err(storage_error)? as u64;

    let stockers = users::Entity::find()
        .join(JoinType::InnerJoin, users::Relation::Stocks.def())
        .filter(stocks::Column::NoteId.eq(note.id))
        .order_by_desc(stocks::Column::CreatedAt)
        .offset(offset_for(page, per_page))
        .limit(per_page)
        .all(db)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items: stockers.iter().map(Profile::from_user).collect::<Vec<_>>(),
        page,
        per_page,
        total,
    }))
}

/// Re-read the trigger-maintained count after a toggle.
async fn fresh_stock_count(db: &DatabaseConnection, note_id: i32) -> Result<i32, Error> {
    Ok(notes::Entity::find_by_id(note_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .map(|n| n.stock_count)
        .unwrap_or(0))
}
