//! Topic endpoints

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notes::{self, NoteProjection};
use crate::orm::{topic_follows, topics};
use crate::relation;
use crate::topics as topic_service;
use crate::web::{offset_for, relation_error, storage_error, PageOf, PageQuery};
use actix_web::{delete, error, get, put, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_topics)
        .service(view_topic)
        .service(view_topic_notes)
        .service(create_topic_follow)
        .service(delete_topic_follow);
}

#[derive(Serialize)]
struct TopicView {
    name: String,
    slug: String,
    note_count: i32,
    follower_count: i32,
    /// Whether the requesting user follows this topic.
    following: bool,
}

/// Response for topic follow toggles
#[derive(Serialize)]
struct TopicFollowResponse {
    success: bool,
    following: bool,
    changed: bool,
    follower_count: i32,
}

#[get("/topics")]
async fn list_topics(client: ClientCtx) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let all = topic_service::list(db, 100).await.map_err(storage_error)?;

    let mut items = Vec::with_capacity(all.len());
    for topic in all {
        let following = is_following(db, &client, topic.id).await?;
        items.push(TopicView {
            name: topic.name,
            slug: topic.slug,
            note_count: topic.note_count,
            follower_count: topic.follower_count,
            following,
        });
    }

    Ok(HttpResponse::Ok().json(items))
}

#[get("/topics/{slug}")]
async fn view_topic(client: ClientCtx, path: web::Path<(String,)>) -> Result<HttpResponse, Error> {
    let slug = path.into_inner().0;
    let db = get_db_pool();

    let topic = require_topic(db, &slug).await?;
    let following = is_following(db, &client, topic.id).await?;

    Ok(HttpResponse::Ok().json(TopicView {
        name: topic.name,
        slug: topic.slug,
        note_count: topic.note_count,
        follower_count: topic.follower_count,
        following,
    }))
}

#[get("/topics/{slug}/notes")]
async fn view_topic_notes(
    path: web::Path<(String,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let slug = path.into_inner().0;
    let db = get_db_pool();
    let limits = crate::app_config::limits();
    let (page, per_page) = query.clamp(limits.notes_per_page as u64, limits.max_per_page as u64);

    let topic = require_topic(db, &slug).await?;

    let (models, total) =
        notes::list_by_topic(db, topic.id, offset_for(page, per_page), per_page)
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

/// Follow a topic (idempotent)
#[put("/topics/{slug}/follow")]
async fn create_topic_follow(
    client: ClientCtx,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let slug = path.into_inner().0;
    let db = get_db_pool();

    let topic = require_topic(db, &slug).await?;

    let outcome = relation::ensure_exists::<topic_follows::Entity>(db, user_id, topic.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(TopicFollowResponse {
        success: true,
        following: true,
        changed: outcome.created,
        follower_count: fresh_follower_count(db, topic.id).await?,
    }))
}

/// Unfollow a topic (idempotent; absence is a silent success)
#[delete("/topics/{slug}/follow")]
async fn delete_topic_follow(
    client: ClientCtx,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let slug = path.into_inner().0;
    let db = get_db_pool();

    let topic = require_topic(db, &slug).await?;

    let outcome = relation::ensure_absent::<topic_follows::Entity>(db, user_id, topic.id)
        .await
        .map_err(relation_error)?;

    Ok(HttpResponse::Ok().json(TopicFollowResponse {
        success: true,
        following: false,
        changed: outcome.deleted,
        follower_count: fresh_follower_count(db, topic.id).await?,
    }))
}

async fn require_topic(db: &DatabaseConnection, slug: &str) -> Result<topics::Model, Error> {
    topic_service::find_by_slug(db, slug)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Topic not found."))
}

async fn is_following(
    db: &DatabaseConnection,
    client: &ClientCtx,
    topic_id: i32,
) -> Result<bool, Error> {
    match client.get_id() {
        Some(user_id) => relation::pair_exists::<topic_follows::Entity, _>(db, user_id, topic_id)
            .await
            .map_err(storage_error),
        None => Ok(false),
    }
}

/// Re-read the trigger-maintained count after a toggle.
async fn fresh_follower_count(db: &DatabaseConnection, topic_id: i32) -> Result<i32, Error> {
    Ok(topics::Entity::find_by_id(topic_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .map(|t| t.follower_count)
        .unwrap_or(0))
}
