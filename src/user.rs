//! User profiles and identity-backed provisioning.
//!
//! Users are never registered directly; a row is provisioned the first time
//! a verified identity subject is seen. Provisioning is idempotent: the
//! unique index on provider_sub is the final arbiter when two first
//! requests race.

use crate::cache;
use crate::identity::IdentityClaims;
use crate::orm::users;
use crate::relation::is_unique_violation;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};
use serde::Serialize;

/// Base URL fragment for resource.
pub static RESOURCE_URL: &str = "users";

/// A struct to hold all information for a user, including relational counts.
#[derive(Clone, Debug, FromQueryResult, Serialize)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i32,
    pub following_count: i32,
    pub created_at: chrono::NaiveDateTime,
    pub note_count: Option<i64>,
    pub stock_count: Option<i64>,
}

impl Profile {
    /// Returns a fully qualified user profile by id.
    pub async fn get_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<Self>, DbErr> {
        use sea_orm::{DbBackend, Statement};

        // Raw SQL to include note and stock counts in one round-trip.
        let sql = r#"
            SELECT
                u.id,
                u.name,
                u.avatar_url,
                u.bio,
                u.follower_count,
                u.following_count,
                u.created_at,
                COUNT(DISTINCT n.id) as note_count,
                COUNT(DISTINCT s.id) as stock_count
            FROM users u
            LEFT JOIN notes n ON n.author_id = u.id AND n.is_published
            LEFT JOIN stocks s ON s.user_id = u.id
            WHERE u.id = $1
            GROUP BY u.id
        "#;

        Self::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            vec![id.into()],
        ))
        .one(db)
        .await
    }

    /// Profile view of a bare user row, without the count subqueries.
    pub fn from_user(user: &users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
            follower_count: user.follower_count,
            following_count: user.following_count,
            created_at: user.created_at,
            note_count: None,
            stock_count: None,
        }
    }
}

/// Find a user row by its identity provider subject.
pub async fn find_by_sub(
    db: &DatabaseConnection,
    sub: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::ProviderSub.eq(sub))
        .one(db)
        .await
}

/// Resolve verified identity claims to a local user row, creating one on
/// first sight. Safe under concurrent first requests for the same subject.
pub async fn find_or_provision(
    db: &DatabaseConnection,
    claims: &IdentityClaims,
) -> Result<users::Model, DbErr> {
    if let Some(id) = cache::get_user_id_for_sub(&claims.sub) {
        if let Some(user) = users::Entity::find_by_id(id).one(db).await? {
            return Ok(user);
        }
        // Row vanished under the cache entry.
        cache::invalidate_user_id_for_sub(&claims.sub);
    }

    if let Some(user) = find_by_sub(db, &claims.sub).await? {
        cache::cache_user_id_for_sub(&claims.sub, user.id);
        return Ok(user);
    }

    let name = claims
        .name
        .clone()
        .unwrap_or_else(|| claims.sub.chars().take(12).collect());

    let inserted = users::ActiveModel {
        provider_sub: Set(claims.sub.clone()),
        name: Set(name),
        email: Set(claims.email.clone()),
        avatar_url: Set(claims.avatar_url.clone()),
        bio: Set(None),
        follower_count: Set(0),
        following_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(user) => {
            cache::cache_user_id_for_sub(&claims.sub, user.id);
            Ok(user)
        }
        Err(err) if is_unique_violation(&err) => {
            // Two first requests raced; the earlier insert wins.
            match find_by_sub(db, &claims.sub).await? {
                Some(user) => {
                    cache::cache_user_id_for_sub(&claims.sub, user.id);
                    Ok(user)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}
