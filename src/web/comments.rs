//! Comment endpoints

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notes::AuthorView;
use crate::orm::{comments, users};
use crate::web::{offset_for, require_visible_note, storage_error, PageOf, PageQuery};
use actix_web::{delete, error, get, post, web, Error, HttpResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_comments)
        .service(create_comment)
        .service(delete_comment);
}

#[derive(Debug, Deserialize, Validate)]
struct NewComment {
    #[validate(length(min = 1))]
    body: String,
}

#[derive(Serialize)]
struct CommentView {
    id: i32,
    body: String,
    created_at: chrono::NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<AuthorView>,
}

fn comment_view(comment: comments::Model, author: Option<users::Model>) -> CommentView {
    CommentView {
        id: comment.id,
        body: comment.body,
        created_at: comment.created_at,
        author: author.map(|user| AuthorView {
            id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
        }),
    }
}

#[get("/notes/{token}/comments")]
async fn list_comments(
    client: ClientCtx,
    path: web::Path<(String,)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let token = path.into_inner().0;
    let db = get_db_pool();
    let limits = crate::app_config::limits();
    let (page, per_page) = query.clamp(limits.comments_per_page as u64, limits.max_per_page as u64);

    let note = require_visible_note(&client, &token).await?;

    let total = comments::Entity::find()
        .filter(comments::Column::NoteId.eq(note.id))
        .count(db)
        .await
        .map_err(storage_error)? as u64;

    let rows = comments::Entity::find()
        .filter(comments::Column::NoteId.eq(note.id))
        .find_also_related(users::Entity)
        .order_by_asc(comments::Column::CreatedAt)
        .offset(offset_for(page, per_page))
        .limit(per_page)
        .all(db)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Ok().json(PageOf {
        items: rows
            .into_iter()
            .map(|(comment, author)| comment_view(comment, author))
            .collect::<Vec<_>>(),
        page,
        per_page,
        total,
    }))
}

#[post("/notes/{token}/comments")]
async fn create_comment(
    client: ClientCtx,
    path: web::Path<(String,)>,
    input: web::Json<NewComment>,
) -> Result<HttpResponse, Error> {
    let author_id = client.require_login()?;
    let token = path.into_inner().0;
    let db = get_db_pool();

    input
        .validate()
        .map_err(|e| error::ErrorBadRequest(e.to_string()))?;

    let limits = crate::app_config::limits();
    if input.body.len() > limits.max_comment_length as usize {
        return Err(error::ErrorBadRequest(format!(
            "comment exceeds {} bytes",
            limits.max_comment_length
        )));
    }

    let note = require_visible_note(&client, &token).await?;

    let comment = comments::ActiveModel {
        note_id: Set(note.id),
        author_id: Set(Some(author_id)),
        body: Set(input.body.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(storage_error)?;

    let author = users::Entity::find_by_id(author_id)
        .one(db)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::Created().json(comment_view(comment, author)))
}

#[delete("/comments/{comment_id}")]
async fn delete_comment(client: ClientCtx, path: web::Path<(i32,)>) -> Result<HttpResponse, Error> {
    let comment_id = path.into_inner().0;
    let db = get_db_pool();

    let comment = comments::Entity::find_by_id(comment_id)
        .one(db)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))?;

    client.require_ownership(comment.author_id)?;

    comments::Entity::delete_by_id(comment_id)
        .exec(db)
        .await
        .map_err(storage_error)?;

    Ok(HttpResponse::NoContent().finish())
}
