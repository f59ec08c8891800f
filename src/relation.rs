//! Idempotent toggle service for uniquely keyed relation rows.
//!
//! Follows, stocks, likes, circle memberships and note tagging are all the
//! same shape: a junction row addressed by a unique (left, right) id pair
//! that either exists or does not. [`ensure_exists`] and [`ensure_absent`]
//! make the row match caller intent regardless of its current state and
//! report whether anything actually changed.
//!
//! The lookup inside the transaction is an optimization; the database unique
//! constraint on the pair is the final arbiter. A concurrent insert that
//! trips the constraint after the lookup is absorbed by re-reading the pair.

use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, TransactionTrait};

use crate::orm::{circle_members, likes, note_topics, stocks, topic_follows, user_follows};

/// Outcome of [`ensure_exists`].
#[derive(Debug, Clone, PartialEq)]
pub struct Toggled<M> {
    pub relation: M,
    /// True when this call inserted the row; false when it already existed.
    pub created: bool,
}

/// Outcome of [`ensure_absent`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<M> {
    /// The row as it was before deletion, when one existed.
    pub relation: Option<M>,
    /// True when this call deleted the row; false when it was already absent.
    pub deleted: bool,
}

/// Errors surfaced by the toggle service.
///
/// Deleting an absent pair is not an error; both operations are silent
/// successes when the storage state already matches intent.
#[derive(Debug, derive_more::Display)]
pub enum RelationError {
    /// Rejected before any transaction started.
    #[display(fmt = "invalid relation pair: {}", _0)]
    Validation(&'static str),
    /// A concurrent insert won the unique key and the row could not be re-read.
    #[display(fmt = "conflicting concurrent write on relation pair")]
    Conflict,
    /// Storage failure, propagated unchanged.
    #[display(fmt = "storage error: {}", _0)]
    Storage(DbErr),
}

impl std::error::Error for RelationError {}

impl From<DbErr> for RelationError {
    fn from(err: DbErr) -> Self {
        RelationError::Storage(err)
    }
}

/// A junction entity addressable by a unique (left, right) id pair.
pub trait RelationPair: EntityTrait {
    /// The entity's active model; EntityTrait does not name it, so the
    /// pair trait carries it for the generic insert.
    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send;

    /// Column holding the owning side of the pair.
    fn left_col() -> Self::Column;
    /// Column holding the related side of the pair.
    fn right_col() -> Self::Column;
    /// Fresh active model for inserting the pair.
    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active;
}

/// Look up a relation row by its pair on any connection or transaction.
pub async fn find_pair<E, C>(db: &C, left_id: i32, right_id: i32) -> Result<Option<E::Model>, DbErr>
where
    E: RelationPair,
    C: sea_orm::ConnectionTrait,
{
    E::find()
        .filter(E::left_col().eq(left_id))
        .filter(E::right_col().eq(right_id))
        .one(db)
        .await
}

/// Returns whether a relation row exists for the pair.
pub async fn pair_exists<E, C>(db: &C, left_id: i32, right_id: i32) -> Result<bool, DbErr>
where
    E: RelationPair,
    C: sea_orm::ConnectionTrait,
{
    Ok(find_pair::<E, C>(db, left_id, right_id).await?.is_some())
}

/// Make the relation row for (left, right) exist, idempotently.
///
/// Returns the row and `created = true` only when this call inserted it.
pub async fn ensure_exists<E>(
    db: &DatabaseConnection,
    left_id: i32,
    right_id: i32,
) -> Result<Toggled<E::Model>, RelationError>
where
    E: RelationPair,
    E::Model: IntoActiveModel<E::Active>,
{
    validate_pair(left_id, right_id)?;

    let txn = db.begin().await?;

    if let Some(existing) = find_pair::<E, _>(&txn, left_id, right_id).await? {
        txn.commit().await?;
        return Ok(Toggled {
            relation: existing,
            created: false,
        });
    }

    let inserted = E::pair(left_id, right_id, Utc::now().naive_utc())
        .insert(&txn)
        .await;

    match inserted {
        Ok(relation) => {
            txn.commit().await?;
            Ok(Toggled {
                relation,
                created: true,
            })
        }
        Err(err) if is_unique_violation(&err) => {
            // A failed statement aborts the transaction; re-read on the pool.
            let _ = txn.rollback().await;
            match find_pair::<E, _>(db, left_id, right_id).await? {
                Some(relation) => Ok(Toggled {
                    relation,
                    created: false,
                }),
                None => Err(RelationError::Conflict),
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Make the relation row for (left, right) absent, idempotently.
///
/// Returns the deleted row and `deleted = true` only when a row was removed.
/// Absence is a silent success, not an error.
pub async fn ensure_absent<E>(
    db: &DatabaseConnection,
    left_id: i32,
    right_id: i32,
) -> Result<Removed<E::Model>, RelationError>
where
    E: RelationPair,
{
    validate_pair(left_id, right_id)?;

    let txn = db.begin().await?;

    let existing = match find_pair::<E, _>(&txn, left_id, right_id).await? {
        Some(model) => model,
        None => {
            txn.commit().await?;
            return Ok(Removed {
                relation: None,
                deleted: false,
            });
        }
    };

    E::delete_many()
        .filter(E::left_col().eq(left_id))
        .filter(E::right_col().eq(right_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(Removed {
        relation: Some(existing),
        deleted: true,
    })
}

fn validate_pair(left_id: i32, right_id: i32) -> Result<(), RelationError> {
    if left_id <= 0 {
        return Err(RelationError::Validation("left id must be positive"));
    }
    if right_id <= 0 {
        return Err(RelationError::Validation("right id must be positive"));
    }
    Ok(())
}

/// Detect a unique key violation without depending on driver error types.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("duplicate key value violates unique constraint")
        || message.contains("UNIQUE constraint failed")
}

impl RelationPair for user_follows::Entity {
    type Active = user_follows::ActiveModel;

    fn left_col() -> Self::Column {
        user_follows::Column::FollowerId
    }

    fn right_col() -> Self::Column {
        user_follows::Column::FollowingId
    }

    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active {
        user_follows::ActiveModel {
            follower_id: Set(left_id),
            following_id: Set(right_id),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}

impl RelationPair for topic_follows::Entity {
    type Active = topic_follows::ActiveModel;

    fn left_col() -> Self::Column {
        topic_follows::Column::UserId
    }

    fn right_col() -> Self::Column {
        topic_follows::Column::TopicId
    }

    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active {
        topic_follows::ActiveModel {
            user_id: Set(left_id),
            topic_id: Set(right_id),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}

impl RelationPair for stocks::Entity {
    type Active = stocks::ActiveModel;

    fn left_col() -> Self::Column {
        stocks::Column::UserId
    }

    fn right_col() -> Self::Column {
        stocks::Column::NoteId
    }

    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active {
        stocks::ActiveModel {
            user_id: Set(left_id),
            note_id: Set(right_id),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}

impl RelationPair for likes::Entity {
    type Active = likes::ActiveModel;

    fn left_col() -> Self::Column {
        likes::Column::UserId
    }

    fn right_col() -> Self::Column {
        likes::Column::NoteId
    }

    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active {
        likes::ActiveModel {
            user_id: Set(left_id),
            note_id: Set(right_id),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}

impl RelationPair for circle_members::Entity {
    type Active = circle_members::ActiveModel;

    fn left_col() -> Self::Column {
        circle_members::Column::UserId
    }

    fn right_col() -> Self::Column {
        circle_members::Column::CircleId
    }

    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active {
        circle_members::ActiveModel {
            user_id: Set(left_id),
            circle_id: Set(right_id),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}

impl RelationPair for note_topics::Entity {
    type Active = note_topics::ActiveModel;

    fn left_col() -> Self::Column {
        note_topics::Column::NoteId
    }

    fn right_col() -> Self::Column {
        note_topics::Column::TopicId
    }

    fn pair(left_id: i32, right_id: i32, created_at: chrono::NaiveDateTime) -> Self::Active {
        note_topics::ActiveModel {
            note_id: Set(left_id),
            topic_id: Set(right_id),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}
