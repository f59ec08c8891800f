//! Endpoints for the authenticated user

use crate::circles::{self, CircleView};
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notes::{self, NoteProjection};
use crate::orm::{notes as notes_orm, user_follows};
use crate::user::Profile;
use crate::web::{offset_for, storage_error, PageOf, PageQuery};
use actix_web::{error, get, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_me)
        .service(view_my_stocks)
        .service(view_my_circles)
        .service(view_my_feed);
}

#[get("/me")]
async fn view_me(client: ClientCtx) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;

    let profile = Profile::get_by_id(get_db_pool(), user_id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    Ok(HttpResponse::Ok().json(profile))
}

#[get("/me/stocks")]
async fn view_my_stocks(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let db = get_db_pool();
    let limits = crate::app_config::limits();
    let (page, per_page) = query.clamp(limits.notes_per_page as u64, limits.max_per_page as u64);

    let (models, total) =
        notes::list_stocked_by(db, user_id, offset_for(page, per_page), per_page)
            .await
            .map_err(storage_error)?;

    let mut items = Vec::with_capacity(models.len());
    for note in models {
        let view = notes::project_note(
            db,
            note,
            NoteProjection {
                with_author: true,
                with_topics: false,
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

#[get("/me/circles")]
async fn view_my_circles(client: ClientCtx) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;

    let models = circles::list_for_user(get_db_pool(), user_id)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(
        models
            .into_iter()
            .map(CircleView::from_model)
            .collect::<Vec<_>>(),
    ))
}

/// Published notes from users the caller follows, newest first.
#[get("/me/feed")]
async fn view_my_feed(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let db = get_db_pool();
    let limits = crate::app_config::limits();
    let (page, per_page) = query.clamp(limits.notes_per_page as u64, limits.max_per_page as u64);

    let following_ids: Vec<i32> = user_follows::Entity::find()
        .filter(user_follows::Column::FollowerId.eq(user_id))
        .all(db)
        .await
        .map_err(storage_error)?
        .into_iter()
        .map(|follow| follow.following_id)
        .collect();

    if following_ids.is_empty() {
        return Ok(HttpResponse::Ok().json(PageOf::<notes::NoteView> {
            items: vec![],
            page,
            per_page,
            total: 0,
        }));
    }

    let total = notes_orm::Entity::find()
        .filter(notes_orm::Column::AuthorId.is_in(following_ids.clone()))
        .filter(notes_orm::Column::IsPublished.eq(true))
        .filter(notes_orm::Column::CircleId.is_null())
        .count(db)
        .await
        .map_err(storage_error)? as u64;

    let models = notes_orm::Entity::find()
        .filter(notes_orm::Column::AuthorId.is_in(following_ids))
        .filter(notes_orm::Column::IsPublished.eq(true))
        .filter(notes_orm::Column::CircleId.is_null())
        .order_by_desc(notes_orm::Column::CreatedAt)
        .offset(offset_for(page, per_page))
        .limit(per_page)
        .all(db)
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
