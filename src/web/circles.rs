//! Circle endpoints
//!
//! Membership is a toggle relation between a user and a circle. The owner
//! is enrolled at creation and cannot leave without deleting the circle.

use crate::circles::{self, CircleError, CircleView, NewCircle};
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notes::{self, NoteProjection};
use crate::orm::{circle_members, circles as circles_orm};
use crate::relation;
use crate::token::TokenSource;
use crate::user::Profile;
use crate::web::{offset_for, relation_error, storage_error, PageOf, PageQuery};
use actix_web::{delete, error, get, post, put, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use serde::Serialize;
use std::sync::Arc;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_circles)
        .service(create_circle)
        .service(view_circle)
        .service(view_circle_members)
        .service(view_circle_notes)
        .service(create_membership)
        .service(delete_membership);
}

/// Response for membership toggles
#[derive(Serialize)]
struct MembershipResponse {
    success: bool,
    /// Whether the caller is now a member.
    member: bool,
    /// Whether this request changed anything.
    changed: bool,
    member_count: i32,
}

#[get("/circles")]
async fn list_circles(query: web::Query<PageQuery>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let (page, per_page) = query.clamp(20, 100);

    let total = circles_orm::Entity::find()
        .count(db)
        .await
        .map_err(storage_error)? as u64;

    let models = circles_orm::Entity::find()
        .order_by_desc(circles_orm::Column::MemberCount)
        .order_by_asc(circles_orm::Column::Name)
        .offset(offset_for(page, per_page))
        .limit(per_page)
        .all(db)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items: models
            .into_iter()
            .map(CircleView::from_model)
            .collect::<Vec<_>>(),
        page,
        per_page,
        total,
    }))
}

#[post("/circles")]
async fn create_circle(
    client: ClientCtx,
    input: web::Json<NewCircle>,
    tokens: web::Data<Arc<dyn TokenSource>>,
) -> Result<HttpResponse, Error> {
    let owner_id = client.require_login()?;
    let db = get_db_pool();

    let circle = circles::create_circle(db, tokens.get_ref().as_ref(), owner_id, &input)
        .await
        .map_err(circle_error)?;

    Ok(HttpResponse::Created().json(CircleView::from_model(circle)))
}

#[get("/circles/{token}")]
async fn view_circle(path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;

    let circle = require_circle(get_db_pool(), &token).await?;

    Ok(HttpResponse::Ok().json(CircleView::from_model(circle)))
}

#[get("/circles/{token}/members")]
async fn view_circle_members(
    path: web::Path<(String,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();
    let (page, per_page) = query.clamp(20, 100);

    let circle = require_circle(db, &token).await?;

    let (members, total) =
        circles::list_members(db, circle.id, offset_for(page, per_page), per_page)
            .await
            .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items: members.iter().map(Profile::from_user).collect::<Vec<_>>(),
        page,
        per_page,
        total,
    }))
}

/// Notes inside a circle; members only.
#[get("/circles/{token}/notes")]
async fn view_circle_notes(
    client: ClientCtx,
    path: web::Path<(String,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();
    let limits = crate::app_config::limits();
    let (page, per_page) = query.clamp(limits.notes_per_page as u64, limits.max_per_page as u64);

    let circle = require_circle(db, &token).await?;

    let is_member = circle.owner_id == user_id
        || relation::pair_exists::<circle_members::Entity, _>(db, user_id, circle.id)
            .await
            .map_err(storage_error)?;
    if !is_member {
        return Err(error::ErrorForbidden("Not a member of this circle"));
    }

    let (models, total) =
        notes::list_by_circle(db, circle.id, offset_for(page, per_page), per_page)
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

/// Join a circle (idempotent)
#[put("/circles/{token}/membership")]
async fn create_membership(
    client: ClientCtx,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    let circle = require_circle(db, &token).await?;

    let outcome = relation::ensure_exists::<circle_members::Entity>(db, user_id, circle.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(MembershipResponse {
        success: true,
        member: true,
        changed: outcome.created,
        member_count: fresh_member_count(db, circle.id).await?,
    }))
}

/// Leave a circle (idempotent; absence is a silent success)
#[delete("/circles/{token}/membership")]
async fn delete_membership(
    client: ClientCtx,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    let circle = require_circle(db, &token).await?;

    if circle.owner_id == user_id {
        return Err(error::ErrorBadRequest("The owner cannot leave the circle"));
    }

    let outcome = relation::ensure_absent::<circle_members::Entity>(db, user_id, circle.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(MembershipResponse {
        success: true,
        member: false,
        changed: outcome.deleted,
        member_count: fresh_member_count(db, circle.id).await?,
    }))
}

async fn require_circle(db: &DatabaseConnection, token: &str) -> Result<circles_orm::Model, Error> {
    circles::find_by_token(db, token)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Circle not found."))
}

/// Re-read the trigger-maintained count after a toggle.
async fn fresh_member_count(db: &DatabaseConnection, circle_id: i32) -> Result<i32, Error> {
    Ok(circles_orm::Entity::find_by_id(circle_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .map(|c| c.member_count)
        .unwrap_or(0))
}

fn circle_error(err: CircleError) -> Error {
    match err {
        CircleError::Validation(msg) => error::ErrorBadRequest(msg),
        CircleError::Storage(e) => storage_error(e),
    }
}
