//! Note CRUD endpoints

use crate::config::RuntimeConfig;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notes::{self, NewNote, NoteError, NoteProjection, UpdateNote};
use crate::token::TokenSource;
use crate::web::{offset_for, storage_error, PageOf, PageQuery};
use actix_web::{delete, error, get, patch, post, web, Error, HttpResponse};
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_notes)
        .service(create_note)
        .service(view_note)
        .service(update_note)
        .service(delete_note);
}

#[get("/notes")]
async fn list_notes(
    query: web::Query<PageQuery>,
    config: web::Data<Arc<RuntimeConfig>>,
) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let limits = crate::app_config::limits();

    // Admins can retune the default page size at runtime.
    let default_per_page = config.get_int_or("notes_per_page", limits.notes_per_page as i64);
    let (page, per_page) = query.clamp(default_per_page as u64, limits.max_per_page as u64);

    let (models, total) = notes::list_published(db, offset_for(page, per_page), per_page)
        .await
        .map_err(storage_error)?;

    let mut items = Vec::with_capacity(models.len());
    for note in models {
        let view = notes::project_note(
            db,
            note,
            NoteProjection {
                with_author: true,
                with_topics: true,
            },
        )
        .await
        .map_err(storage_error)?;
        items.push(view);
    }

    Ok(HttpResponse::Ok().json(PageOf {
        items,
        page,
        per_page,
        total,
    }))
}

#[post("/notes")]
async fn create_note(
    client: ClientCtx,
    input: web::Json<NewNote>,
    tokens: web::Data<Arc<dyn TokenSource>>,
    config: web::Data<Arc<RuntimeConfig>>,
) -> Result<HttpResponse, Error> {
    let author_id = client.require_login()?;
    let db = get_db_pool();

    if config.is_feature_enabled("read_only_mode") {
        return Err(error::ErrorServiceUnavailable("Writes are disabled"));
    }

    let note = notes::create_note(db, tokens.get_ref().as_ref(), author_id, &input)
        .await
        .map_err(note_error)?;

    let view = notes::project_note(
        db,
        note,
        NoteProjection {
            with_author: true,
            with_topics: true,
        },
    )
    .await
    .map_err(storage_error)?;

    Ok(HttpResponse::Created().json(view))
}

#[get("/notes/{token}")]
async fn view_note(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = notes::find_by_token(db, &token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Note not found."))?;

    if !notes::can_view(db, &note, client.get_id())
        .await
        .map_err(storage_error)?
    {
        return Err(error::ErrorNotFound("Note not found."));
    }

    let view = notes::project_note(
        db,
        note,
        NoteProjection {
            with_author: true,
            with_topics: true,
        },
    )
    .await
    .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(view))
}

#[patch("/notes/{token}")]
async fn update_note(
    client: ClientCtx,
    path: web::Path<(String,)>,
    input: web::Json<UpdateNote>,
) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = notes::find_by_token(db, &token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Note not found."))?;

    client.require_ownership(Some(note.author_id))?;

    let updated = notes::update_note(db, note, &input).await.map_err(note_error)?;

    let view = notes::project_note(
        db,
        updated,
        NoteProjection {
            with_author: true,
            with_topics: true,
        },
    )
    .await
    .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(view))
}

#[delete("/notes/{token}")]
async fn delete_note(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();

    let note = notes::find_by_token(db, &token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Note not found."))?;

    client.require_ownership(Some(note.author_id))?;

    notes::delete_note(db, note.id).await.map_err(storage_error)?;

    Ok(HttpResponse::NoContent().finish())
}

pub(super) fn note_error(err: NoteError) -> Error {
    match err {
        NoteError::Validation(msg) => error::ErrorBadRequest(msg),
        NoteError::CircleNotFound => error::ErrorNotFound("Circle not found"),
        NoteError::NotCircleMember => error::ErrorForbidden("Not a member of this circle"),
        NoteError::Storage(e) => storage_error(e),
    }
}
