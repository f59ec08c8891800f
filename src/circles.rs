//! Circle services.
//!
//! Circles are member-scoped groups of notes. Membership is a toggle
//! relation; the owner is enrolled in the same transaction that creates
//! the circle, so a circle never exists without at least one member.

use crate::orm::{circle_members, circles, users};
use crate::token::TokenSource;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, derive_more::Display)]
pub enum CircleError {
    #[display(fmt = "validation failed: {}", _0)]
    Validation(String),
    #[display(fmt = "storage error: {}", _0)]
    Storage(DbErr),
}

impl std::error::Error for CircleError {}

impl From<DbErr> for CircleError {
    fn from(err: DbErr) -> Self {
        CircleError::Storage(err)
    }
}

/// Payload for creating a circle.
#[derive(Debug, Deserialize, Validate)]
pub struct NewCircle {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// JSON view of a circle.
#[derive(Debug, Serialize)]
pub struct CircleView {
    pub token: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i32,
    pub member_count: i32,
    pub created_at: chrono::NaiveDateTime,
}

impl CircleView {
    pub fn from_model(circle: circles::Model) -> Self {
        Self {
            token: circle.token,
            name: circle.name,
            description: circle.description,
            owner_id: circle.owner_id,
            member_count: circle.member_count,
            created_at: circle.created_at,
        }
    }
}

pub async fn find_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<circles::Model>, DbErr> {
    circles::Entity::find()
        .filter(circles::Column::Token.eq(token))
        .one(db)
        .await
}

/// Create a circle and enroll its owner atomically.
pub async fn create_circle(
    db: &DatabaseConnection,
    token_source: &dyn TokenSource,
    owner_id: i32,
    input: &NewCircle,
) -> Result<circles::Model, CircleError> {
    input
        .validate()
        .map_err(|e| CircleError::Validation(e.to_string()))?;

    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let circle = circles::ActiveModel {
        token: Set(token_source.issue()),
        name: Set(input.name.clone()),
        description: Set(input.description.clone()),
        owner_id: Set(owner_id),
        member_count: Set(0),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    circle_members::ActiveModel {
        user_id: Set(owner_id),
        circle_id: Set(circle.id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    Ok(circle)
}

/// Circles a user belongs to, most recently joined first.
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<circles::Model>, DbErr> {
    circles::Entity::find()
        .join(JoinType::InnerJoin, circles::Relation::CircleMembers.def())
        .filter(circle_members::Column::UserId.eq(user_id))
        .order_by_desc(circle_members::Column::CreatedAt)
        .all(db)
        .await
}

/// Members of a circle, oldest first.
pub async fn list_members(
    db: &DatabaseConnection,
    circle_id: i32,
    offset: u64,
    limit: u64,
) -> Result<(Vec<users::Model>, u64), DbErr> {
    let total = users::Entity::find()
        .join(JoinType::InnerJoin, users::Relation::CircleMembers.def())
        .filter(circle_members::Column::CircleId.eq(circle_id))
        .count(db)
        .await? as u64;

    let items = users::Entity::find()
        .join(JoinType::InnerJoin, users::Relation::CircleMembers.def())
        .filter(circle_members::Column::CircleId.eq(circle_id))
        .order_by_asc(circle_members::Column::CreatedAt)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    Ok((items, total))
}
