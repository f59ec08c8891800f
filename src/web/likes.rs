//! Like endpoints

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{likes, notes};
use crate::relation;
use crate::web::{relation_error, require_visible_note, storage_error};
use actix_web::{delete, error, get, put, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_likes).service(create_like).service(delete_like);
}

/// Response for like toggles and state reads
#[derive(Serialize)]
struct LikeResponse {
    success: bool,
    /// Whether the caller now likes the note.
    liked: bool,
    /// Whether this request changed anything.
    changed: bool,
    like_count: i32,
}

#[get("/notes/{token}/likes")]
async fn view_likes(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = require_visible_note(&client, &token).await?;

    let liked = match client.get_id() {
        Some(user_id) => relation::pair_exists::<likes::Entity, _>(db, user_id, note.id)
            .await
            .map_err(storage_error)?,
        None => false,
    };

    Ok(HttpResponse::Ok().json(LikeResponse {
        success: true,
        liked,
        changed: false,
        like_count: note.like_count,
    }))
}

/// Like a note (idempotent)
#[put("/notes/{token}/like")]
async fn create_like(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = require_visible_note(&client, &token).await?;

    let outcome = relation::ensure_exists::<likes::Entity>(db, user_id, note.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        success: true,
        liked: true,
        changed: outcome.created,
        like_count: fresh_like_count(db, note.id).await?,
    }))
}

/// Unlike a note (idempotent; absence is a silent success)
#[delete("/notes/{token}/like")]
async fn delete_like(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = crate::notes::find_by_token(db, &token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Note not found."))?;

    let outcome = relation::ensure_absent::<likes::Entity>(db, user_id, note.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        success: true,
        liked: false,
        changed: outcome.deleted,
        like_count: fresh_like_count(db, note.id).await?,
    }))
}

/// Re-read the trigger-maintained count after a toggle.
async fn fresh_like_count(db: &DatabaseConnection, note_id: i32) -> Result<i32, Error> {
    Ok(notes::Entity::find_by_id(note_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .map(|n| n.like_count)
        .unwrap_or(0))
}
