//! Note services: creation, updates, projection-driven fetching, listings.
//!
//! Notes carry denormalized stock/like/comment counts maintained by
//! database triggers; the service reads them back and never updates them
//! directly.

use crate::app_config;
use crate::orm::{circle_members, circles, note_topics, notes, stocks, topics, users};
use crate::relation;
use crate::token::TokenSource;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Errors surfaced by note operations.
#[derive(Debug, derive_more::Display)]
pub enum NoteError {
    #[display(fmt = "validation failed: {}", _0)]
    Validation(String),
    #[display(fmt = "circle not found")]
    CircleNotFound,
    #[display(fmt = "not a member of this circle")]
    NotCircleMember,
    #[display(fmt = "storage error: {}", _0)]
    Storage(DbErr),
}

impl std::error::Error for NoteError {}

impl From<DbErr> for NoteError {
    fn from(err: DbErr) -> Self {
        NoteError::Storage(err)
    }
}

/// Explicit projection for note reads. Callers enumerate exactly what they
/// need; nothing is joined in by default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoteProjection {
    pub with_author: bool,
    pub with_topics: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthorView {
    pub id: i32,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicRef {
    pub name: String,
    pub slug: String,
}

/// JSON view of a note, with optional projected associations.
#[derive(Debug, Serialize)]
pub struct NoteView {
    pub token: String,
    pub title: String,
    pub body: String,
    pub is_published: bool,
    pub in_circle: bool,
    pub stock_count: i32,
    pub like_count: i32,
    pub comment_count: i32,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: Option<chrono::NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<TopicRef>>,
}

/// Payload for creating a note.
#[derive(Debug, Deserialize, Validate)]
pub struct NewNote {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub circle_token: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}

/// Payload for updating a note. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateNote {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub body: Option<String>,
    pub is_published: Option<bool>,
    /// Full replacement set of topic names, when present.
    pub topics: Option<Vec<String>>,
}

pub async fn find_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<notes::Model>, DbErr> {
    notes::Entity::find()
        .filter(notes::Column::Token.eq(token))
        .one(db)
        .await
}

/// Whether a viewer may read this note. Circle notes are restricted to
/// members; unpublished notes to their author.
pub async fn can_view(
    db: &DatabaseConnection,
    note: &notes::Model,
    viewer_id: Option<i32>,
) -> Result<bool, DbErr> {
    if viewer_id == Some(note.author_id) {
        return Ok(true);
    }

    if !note.is_published {
        return Ok(false);
    }

    let circle_id = match note.circle_id {
        Some(id) => id,
        None => return Ok(true),
    };

    let viewer_id = match viewer_id {
        Some(id) => id,
        None => return Ok(false),
    };

    relation::pair_exists::<circle_members::Entity, _>(db, viewer_id, circle_id).await
}

/// Create a note, issuing its public token from the injected source and
/// attaching topics in the same transaction.
pub async fn create_note(
    db: &DatabaseConnection,
    token_source: &dyn TokenSource,
    author_id: i32,
    input: &NewNote,
) -> Result<notes::Model, NoteError> {
    input
        .validate()
        .map_err(|e| NoteError::Validation(e.to_string()))?;

    let limits = app_config::limits();
    if input.body.len() > limits.max_note_length as usize {
        return Err(NoteError::Validation(format!(
            "note body exceeds {} bytes",
            limits.max_note_length
        )));
    }
    if input.topics.len() > limits.max_topics_per_note as usize {
        return Err(NoteError::Validation(format!(
            "at most {} topics per note",
            limits.max_topics_per_note
        )));
    }

    let circle_id = match input.circle_token.as_deref() {
        Some(token) => Some(require_membership(db, author_id, token).await?),
        None => None,
    };

    // Resolve topics before the note transaction; each find_or_create is
    // individually race-safe.
    let mut topic_ids = Vec::with_capacity(input.topics.len());
    for name in &input.topics {
        let topic = crate::topics::find_or_create(db, name).await?;
        if !topic_ids.contains(&topic.id) {
            topic_ids.push(topic.id);
        }
    }

    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let note = notes::ActiveModel {
        token: Set(token_source.issue()),
        author_id: Set(author_id),
        circle_id: Set(circle_id),
        title: Set(input.title.clone()),
        body: Set(input.body.clone()),
        is_published: Set(input.is_published),
        stock_count: Set(0),
        like_count: Set(0),
        comment_count: Set(0),
        created_at: Set(now),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for topic_id in topic_ids {
        note_topics::ActiveModel {
            note_id: Set(note.id),
            topic_id: Set(topic_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    Ok(note)
}

/// Apply a partial update. Topic replacement goes through the toggle
/// service so existing attachments survive untouched.
pub async fn update_note(
    db: &DatabaseConnection,
    note: notes::Model,
    input: &UpdateNote,
) -> Result<notes::Model, NoteError> {
    input
        .validate()
        .map_err(|e| NoteError::Validation(e.to_string()))?;

    let limits = app_config::limits();
    if let Some(body) = &input.body {
        if body.len() > limits.max_note_length as usize {
            return Err(NoteError::Validation(format!(
                "note body exceeds {} bytes",
                limits.max_note_length
            )));
        }
    }

    let note_id = note.id;

    if let Some(names) = &input.topics {
        if names.len() > limits.max_topics_per_note as usize {
            return Err(NoteError::Validation(format!(
                "at most {} topics per note",
                limits.max_topics_per_note
            )));
        }

        let mut target_ids = Vec::with_capacity(names.len());
        for name in names {
            let topic = crate::topics::find_or_create(db, name).await?;
            if !target_ids.contains(&topic.id) {
                target_ids.push(topic.id);
            }
        }

        let current: Vec<i32> = note_topics::Entity::find()
            .filter(note_topics::Column::NoteId.eq(note_id))
            .all(db)
            .await?
            .into_iter()
            .map(|nt| nt.topic_id)
            .collect();

        for topic_id in &target_ids {
            relation::ensure_exists::<note_topics::Entity>(db, note_id, *topic_id)
                .await
                .map_err(note_error_from_relation)?;
        }
        for topic_id in current {
            if !target_ids.contains(&topic_id) {
                relation::ensure_absent::<note_topics::Entity>(db, note_id, topic_id)
                    .await
                    .map_err(note_error_from_relation)?;
            }
        }
    }

    let mut active: notes::ActiveModel = note.into();
    if let Some(title) = &input.title {
        active.title = Set(title.clone());
    }
    if let Some(body) = &input.body {
        active.body = Set(body.clone());
    }
    if let Some(is_published) = input.is_published {
        active.is_published = Set(is_published);
    }
    active.updated_at = Set(Some(Utc::now().naive_utc()));

    Ok(active.update(db).await?)
}

/// Delete a note; relation rows and comments cascade in the database.
pub async fn delete_note(db: &DatabaseConnection, note_id: i32) -> Result<(), DbErr> {
    notes::Entity::delete_by_id(note_id).exec(db).await?;
    Ok(())
}

fn note_error_from_relation(err: relation::RelationError) -> NoteError {
    match err {
        relation::RelationError::Validation(msg) => NoteError::Validation(msg.to_string()),
        relation::RelationError::Conflict => {
            NoteError::Storage(DbErr::Custom("conflicting topic update".to_string()))
        }
        relation::RelationError::Storage(e) => NoteError::Storage(e),
    }
}

async fn require_membership(
    db: &DatabaseConnection,
    user_id: i32,
    circle_token: &str,
) -> Result<i32, NoteError> {
    let circle = circles::Entity::find()
        .filter(circles::Column::Token.eq(circle_token))
        .one(db)
        .await?
        .ok_or(NoteError::CircleNotFound)?;

    if circle.owner_id != user_id
        && !relation::pair_exists::<circle_members::Entity, _>(db, user_id, circle.id).await?
    {
        return Err(NoteError::NotCircleMember);
    }

    Ok(circle.id)
}

/// Materialize the JSON view for a note under an explicit projection.
pub async fn project_note(
    db: &DatabaseConnection,
    note: notes::Model,
    projection: NoteProjection,
) -> Result<NoteView, DbErr> {
    let author = if projection.with_author {
        note.find_related(users::Entity)
            .one(db)
            .await?
            .map(|user| AuthorView {
                id: user.id,
                name: user.name,
                avatar_url: user.avatar_url,
            })
    } else {
        None
    };

    let note_topics = if projection.with_topics {
        Some(
            note.find_related(topics::Entity)
                .order_by_asc(topics::Column::Name)
                .all(db)
                .await?
                .into_iter()
                .map(|topic| TopicRef {
                    name: topic.name,
                    slug: topic.slug,
                })
                .collect(),
        )
    } else {
        None
    };

    Ok(NoteView {
        token: note.token,
        title: note.title,
        body: note.body,
        is_published: note.is_published,
        in_circle: note.circle_id.is_some(),
        stock_count: note.stock_count,
        like_count: note.like_count,
        comment_count: note.comment_count,
        created_at: note.created_at,
        updated_at: note.updated_at,
        author,
        topics: note_topics,
    })
}

/// Public timeline: published notes outside any circle, newest first.
pub async fn list_published(
    db: &DatabaseConnection,
    offset: u64,
    limit: u64,
) -> Result<(Vec<notes::Model>, u64), DbErr> {
    let total = notes::Entity::find()
        .filter(notes::Column::IsPublished.eq(true))
        .filter(notes::Column::CircleId.is_null())
        .count(db)
        .await? as u64;

    let items = notes::Entity::find()
        .filter(notes::Column::IsPublished.eq(true))
        .filter(notes::Column::CircleId.is_null())
        .order_by_desc(notes::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Published notes by one author, newest first.
pub async fn list_by_author(
    db: &DatabaseConnection,
    author_id: i32,
    offset: u64,
    limit: u64,
) -> Result<(Vec<notes::Model>, u64), DbErr> {
    let total = notes::Entity::find()
        .filter(notes::Column::AuthorId.eq(author_id))
        .filter(notes::Column::IsPublished.eq(true))
        .filter(notes::Column::CircleId.is_null())
        .count(db)
        .await? as u64;

    let items = notes::Entity::find()
        .filter(notes::Column::AuthorId.eq(author_id))
        .filter(notes::Column::IsPublished.eq(true))
        .filter(notes::Column::CircleId.is_null())
        .order_by_desc(notes::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Published notes tagged with a topic, newest first.
pub async fn list_by_topic(
    db: &DatabaseConnection,
    topic_id: i32,
    offset: u64,
    limit: u64,
) -> Result<(Vec<notes::Model>, u64), DbErr> {
    let total = notes::Entity::find()
        .join(JoinType::InnerJoin, notes::Relation::NoteTopics.def())
        .filter(note_topics::Column::TopicId.eq(topic_id))
        .filter(notes::Column::IsPublished.eq(true))
        .filter(notes::Column::CircleId.is_null())
        .count(db)
        .await? as u64;

    let items = notes::Entity::find()
        .join(JoinType::InnerJoin, notes::Relation::NoteTopics.def())
        .filter(note_topics::Column::TopicId.eq(topic_id))
        .filter(notes::Column::IsPublished.eq(true))
        .filter(notes::Column::CircleId.is_null())
        .order_by_desc(notes::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Notes inside one circle, newest first. Visibility is the caller's job.
pub async fn list_by_circle(
    db: &DatabaseConnection,
    circle_id: i32,
    offset: u64,
    limit: u64,
) -> Result<(Vec<notes::Model>, u64), DbErr> {
    let total = notes::Entity::find()
        .filter(notes::Column::CircleId.eq(circle_id))
        .count(db)
        .await? as u64;

    let items = notes::Entity::find()
        .filter(notes::Column::CircleId.eq(circle_id))
        .order_by_desc(notes::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}

/// Notes a user has stocked, most recently stocked first.
pub async fn list_stocked_by(
    db: &DatabaseConnection,
    user_id: i32,
    offset: u64,
    limit: u64,
) -> Result<(Vec<notes::Model>, u64), DbErr> {
    let total = notes::Entity::find()
        .join(JoinType::InnerJoin, notes::Relation::Stocks.def())
        .filter(stocks::Column::UserId.eq(user_id))
        .count(db)
        .await? as u64;

    let items = notes::Entity::find()
        .join(JoinType::InnerJoin, notes::Relation::Stocks.def())
        .filter(stocks::Column::UserId.eq(user_id))
        .order_by_desc(stocks::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}
