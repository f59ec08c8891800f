//! Topic services.
//!
//! Topics are created on demand the first time a note is tagged with a new
//! name. Creation is idempotent over the unique name/slug keys; a losing
//! racer re-reads the winner's row.

use crate::orm::topics;
use crate::relation::is_unique_violation;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};

/// Build a URL slug from a topic name. Lowercased ASCII alphanumerics,
/// runs of anything else collapsed to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Normalized topic name: trimmed, interior whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub async fn find_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<topics::Model>, DbErr> {
    topics::Entity::find()
        .filter(topics::Column::Slug.eq(slug))
        .one(db)
        .await
}

pub async fn find_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<topics::Model>, DbErr> {
    topics::Entity::find()
        .filter(topics::Column::Name.eq(name))
        .one(db)
        .await
}

/// Find a topic by name, creating it when absent. The unique constraint on
/// the name is the final arbiter under concurrent creation.
pub async fn find_or_create(db: &DatabaseConnection, name: &str) -> Result<topics::Model, DbErr> {
    let name = normalize_name(name);
    if name.is_empty() {
        return Err(DbErr::Custom("topic name must not be empty".to_string()));
    }

    if let Some(topic) = find_by_name(db, &name).await? {
        return Ok(topic);
    }

    let inserted = topics::ActiveModel {
        name: Set(name.clone()),
        slug: Set(slugify(&name)),
        note_count: Set(0),
        follower_count: Set(0),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(topic) => Ok(topic),
        Err(err) if is_unique_violation(&err) => match find_by_name(db, &name).await? {
            Some(topic) => Ok(topic),
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

/// Topics ordered by note count, most used first.
pub async fn list(db: &DatabaseConnection, limit: u64) -> Result<Vec<topics::Model>, DbErr> {
    topics::Entity::find()
        .order_by_desc(topics::Column::NoteCount)
        .order_by_asc(topics::Column::Name)
        .limit(limit)
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_lowercases() {
        assert_eq!(slugify("Rust"), "rust");
        assert_eq!(slugify("Web Development"), "web-development");
        assert_eq!(slugify("  C++ / Systems!  "), "c-systems");
        assert_eq!(slugify("数据"), "");
    }

    #[test]
    fn normalize_name_collapses_whitespace() {
        assert_eq!(normalize_name("  Web   Development "), "Web Development");
        assert_eq!(normalize_name("rust"), "rust");
        assert_eq!(normalize_name("   "), "");
    }
}
