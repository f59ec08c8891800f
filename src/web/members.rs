//! User profile and follow endpoints

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{user_follows, users};
use crate::relation;
use crate::user::Profile;
use crate::web::{offset_for, relation_error, storage_error, PageOf, PageQuery};
use actix_web::{delete, error, get, post, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_member)
        .service(view_members)
        .service(view_member_notes)
        .service(view_followers)
        .service(view_following)
        .service(create_follow)
        .service(delete_follow);
}

/// Response for follow toggles
#[derive(Serialize)]
struct FollowResponse {
    success: bool,
    /// Whether the caller now follows the target.
    following: bool,
    /// Whether this request changed anything.
    changed: bool,
    follower_count: i32,
}

#[get("/users")]
async fn view_members(query: web::Query<PageQuery>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let (page, per_page) = query.clamp(20, 100);

    let total = users::Entity::find()
        .count(db)
        .await
        .map_err(storage_error)? as u64;

    let members = users::Entity::find()
        .order_by_asc(users::Column::Id)
        .offset(offset_for(page, per_page))
        .limit(per_page)
        .all(db)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items: members.iter().map(Profile::from_user).collect::<Vec<_>>(),
        page,
        per_page,
        total,
    }))
}

#[get("/users/{user_id}")]
async fn view_member(path: web::Path<(i32,)>) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner().0;
    let db = get_db_pool();

    let profile = Profile::get_by_id(db, user_id)
        .await
        .map_err(|e| {
            log::error!("error {:?}", e);
            error::ErrorInternalServerError("Couldn't load user.")
        })?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    Ok(HttpResponse::Ok().json(profile))
}

#[get("/users/{user_id}/notes")]
async fn view_member_notes(
    path: web::Path<(i32,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner().0;
    let db = get_db_pool();
    let limits = crate::app_config::limits();
    let (page, per_page) = query.clamp(limits.notes_per_page as u64, limits.max_per_page as u64);

    let (notes, total) =
        crate::notes::list_by_author(db, user_id, offset_for(page, per_page), per_page)
            .await
            .map_err(storage_error)?;

    let mut items = Vec::with_capacity(notes.len());
    for note in notes {
        let view = crate::notes::project_note(
            db,
            note,
            crate::notes::NoteProjection {
                with_author: false,
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

#[get("/users/{user_id}/followers")]
async fn view_followers(
    path: web::Path<(i32,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner().0;
    let (page, per_page) = query.clamp(20, 100);

    let (items, total) = follow_listing(get_db_pool(), user_id, FollowSide::Followers, page, per_page)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items,
        page,
        per_page,
        total,
    }))
}

#[get("/users/{user_id}/following")]
async fn view_following(
    path: web::Path<(i32,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner().0;
    let (page, per_page) = query.clamp(20, 100);

    let (items, total) = follow_listing(get_db_pool(), user_id, FollowSide::Following, page, per_page)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items,
        page,
        per_page,
        total,
    }))
}

/// Follow a user (idempotent)
#[post("/users/{user_id}/follow")]
async fn create_follow(client: ClientCtx, path: web::Path<(i32,)>) -> Result<HttpResponse, Error> {
    let follower_id = client.require_login()?;
    let following_id = path.into_inner().0;
    let db = get_db_pool();

    if follower_id == following_id {
        return Err(error::ErrorBadRequest("Cannot follow yourself"));
    }

    let target = users::Entity::find_by_id(following_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))?;

    let outcome = relation::ensure_exists::<user_follows::Entity>(db, follower_id, target.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(FollowResponse {
        success: true,
        following: true,
        changed: outcome.created,
        follower_count: fresh_follower_count(db, following_id).await?,
    }))
}

/// Unfollow a user (idempotent; absence is a silent success)
#[delete("/users/{user_id}/follow")]
async fn delete_follow(client: ClientCtx, path: web::Path<(i32,)>) -> Result<HttpResponse, Error> {
    let follower_id = client.require_login()?;
    let following_id = path.into_inner().0;
    let db = get_db_pool();

    let outcome = relation::ensure_absent::<user_follows::Entity>(db, follower_id, following_id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(FollowResponse {
        success: true,
        following: false,
        changed: outcome.deleted,
        follower_count: fresh_follower_count(db, following_id).await?,
    }))
}

/// Re-read the trigger-maintained count after a toggle.
async fn fresh_follower_count(db: &DatabaseConnection, user_id: i32) -> Result<i32, Error> {
    Ok(users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .map(|u| u.follower_count)
        .unwrap_or(0))
}

enum FollowSide {
    Followers,
    Following,
}

async fn follow_listing(
    db: &DatabaseConnection,
    user_id: i32,
    side: FollowSide,
    page: u64,
    per_page: u64,
) -> Result<(Vec<Profile>, u64), DbErr> {
    let select = match side {
        // Users who follow `user_id`.
        FollowSide::Followers => users::Entity::find()
            .join(
                JoinType::InnerJoin,
                user_follows::Relation::Follower.def().rev(),
            )
            .filter(user_follows::Column::FollowingId.eq(user_id)),
        // Users that `user_id` follows.
        FollowSide::Following => users::Entity::find()
            .join(
                JoinType::InnerJoin,
                user_follows::Relation::Following.def().rev(),
            )
            .filter(user_follows::Column::FollowerId.eq(user_id)),
    };

    let total = select.clone().count(db).await? as u64;

    let members = select
        .order_by_desc(user_follows::Column::CreatedAt)
        .offset(offset_for(page, per_page))
        .limit(per_page)
        .all(db)
        .await?;

    Ok((members.iter().map(Profile::from_user).collect(), total))
}
