//! Test fixtures for creating test data
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use chrono::Utc;
use notestock::orm::{circle_members, circles, notes, topics, users};
use notestock::token::{TokenSource, UuidTokenSource};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create a test user provisioned from a fake identity subject
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        provider_sub: Set(format!("test|{}", name)),
        name: Set(name.to_string()),
        email: Set(Some(format!("{}@test.com", name))),
        avatar_url: Set(None),
        bio: Set(None),
        follower_count: Set(0),
        following_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a published test note outside any circle
pub async fn create_test_note(
    db: &DatabaseConnection,
    author_id: i32,
    title: &str,
) -> Result<notes::Model, DbErr> {
    create_test_note_in_circle(db, author_id, title, None).await
}

/// Create a published test note, optionally inside a circle
pub async fn create_test_note_in_circle(
    db: &DatabaseConnection,
    author_id: i32,
    title: &str,
    circle_id: Option<i32>,
) -> Result<notes::Model, DbErr> {
    notes::ActiveModel {
        token: Set(UuidTokenSource.issue()),
        author_id: Set(author_id),
        circle_id: Set(circle_id),
        title: Set(title.to_string()),
        body: Set(format!("Body of {}", title)),
        is_published: Set(true),
        stock_count: Set(0),
        like_count: Set(0),
        comment_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a test topic
pub async fn create_test_topic(
    db: &DatabaseConnection,
    name: &str,
) -> Result<topics::Model, DbErr> {
    topics::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(notestock::topics::slugify(name)),
        note_count: Set(0),
        follower_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a test circle with its owner enrolled, like the service does
pub async fn create_test_circle(
    db: &DatabaseConnection,
    owner_id: i32,
    name: &str,
) -> Result<circles::Model, DbErr> {
    let circle = circles::ActiveModel {
        token: Set(UuidTokenSource.issue()),
        name: Set(name.to_string()),
        description: Set(None),
        owner_id: Set(owner_id),
        member_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    circle_members::ActiveModel {
        user_id: Set(owner_id),
        circle_id: Set(circle.id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(circle)
}
