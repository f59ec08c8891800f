//! Integration tests for user follows/followers

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use notestock::orm::{user_follows, users};
use notestock::relation::{ensure_absent, ensure_exists, RelationError};
use sea_orm::{entity::*, query::*, ColumnTrait, EntityTrait, QueryFilter};

#[actix_rt::test]
#[serial]
async fn test_create_follow_relationship() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    // Create two users
    let follower = create_test_user(&db, "follower_user")
        .await
        .expect("Failed to create follower");

    let following = create_test_user(&db, "following_user")
        .await
        .expect("Failed to create following user");

    // Create follow relationship through the toggle service
    let outcome = ensure_exists::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Failed to create follow");

    assert!(outcome.created);
    assert!(outcome.relation.id > 0);
    assert_eq!(outcome.relation.follower_id, follower.id);
    assert_eq!(outcome.relation.following_id, following.id);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_follow_count_trigger_on_insert() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let follower = create_test_user(&db, "count_follower")
        .await
        .expect("Failed to create follower");

    let following = create_test_user(&db, "count_following")
        .await
        .expect("Failed to create following user");

    assert_eq!(follower.following_count, 0);
    assert_eq!(following.follower_count, 0);

    ensure_exists::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Failed to create follow");

    // Verify counts were updated by trigger
    let follower_after = users::Entity::find_by_id(follower.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(follower_after.following_count, 1);

    let following_after = users::Entity::find_by_id(following.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(following_after.follower_count, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_follow_count_trigger_on_delete() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let follower = create_test_user(&db, "delete_follower")
        .await
        .expect("Failed to create follower");

    let following = create_test_user(&db, "delete_following")
        .await
        .expect("Failed to create following user");

    ensure_exists::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Failed to create follow");

    let outcome = ensure_absent::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Failed to delete follow");
    assert!(outcome.deleted);

    // Verify counts were decremented by trigger
    let follower_after = users::Entity::find_by_id(follower.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(follower_after.following_count, 0);

    let following_after = users::Entity::find_by_id(following.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(following_after.follower_count, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_cannot_follow_self() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "self_follow_user")
        .await
        .expect("Failed to create user");

    // The no_self_follow constraint rejects the insert; the service
    // surfaces it as a storage error rather than swallowing it.
    let result = ensure_exists::<user_follows::Entity>(&db, user.id, user.id).await;
    assert!(matches!(result, Err(RelationError::Storage(_))));

    let rows = user_follows::Entity::find()
        .filter(user_follows::Column::FollowerId.eq(user.id))
        .all(&db)
        .await
        .expect("Query failed");
    assert!(rows.is_empty());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_double_follow_is_idempotent() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let follower = create_test_user(&db, "dup_follower")
        .await
        .expect("Failed to create follower");

    let following = create_test_user(&db, "dup_following")
        .await
        .expect("Failed to create following user");

    let first = ensure_exists::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Failed to create first follow");
    assert!(first.created);

    // Following again is a silent success, not an error.
    let second = ensure_exists::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Second follow should not error");
    assert!(!second.created);
    assert_eq!(second.relation.id, first.relation.id);

    // The trigger-maintained count only moved once.
    let following_after = users::Entity::find_by_id(following.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(following_after.follower_count, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_multiple_followers() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    // Create one popular user and multiple followers
    let popular = create_test_user(&db, "popular_user")
        .await
        .expect("Failed to create popular user");

    let fan1 = create_test_user(&db, "fan1").await.expect("fan1");
    let fan2 = create_test_user(&db, "fan2").await.expect("fan2");
    let fan3 = create_test_user(&db, "fan3").await.expect("fan3");

    for fan in [&fan1, &fan2, &fan3] {
        ensure_exists::<user_follows::Entity>(&db, fan.id, popular.id)
            .await
            .expect("Failed to create follow");
    }

    // Verify popular user has 3 followers
    let popular_after = users::Entity::find_by_id(popular.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(popular_after.follower_count, 3);

    // Verify each follower has 1 following
    for fan in [&fan1, &fan2, &fan3] {
        let f = users::Entity::find_by_id(fan.id)
            .one(&db)
            .await
            .expect("Query failed")
            .expect("User not found");
        assert_eq!(f.following_count, 1);
    }

    // Verify we can query all followers
    let followers = user_follows::Entity::find()
        .filter(user_follows::Column::FollowingId.eq(popular.id))
        .all(&db)
        .await
        .expect("Query failed");
    assert_eq!(followers.len(), 3);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_mutual_follow() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user1 = create_test_user(&db, "mutual1").await.expect("user1");
    let user2 = create_test_user(&db, "mutual2").await.expect("user2");

    ensure_exists::<user_follows::Entity>(&db, user1.id, user2.id)
        .await
        .expect("Failed to create follow 1");
    ensure_exists::<user_follows::Entity>(&db, user2.id, user1.id)
        .await
        .expect("Failed to create follow 2");

    // Both users should have 1 follower and 1 following
    for user in [&user1, &user2] {
        let after = users::Entity::find_by_id(user.id)
            .one(&db)
            .await
            .expect("Query failed")
            .expect("User not found");
        assert_eq!(after.follower_count, 1);
        assert_eq!(after.following_count, 1);
    }

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_follow_cascade_on_user_delete() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let follower = create_test_user(&db, "cascade_follower")
        .await
        .expect("Failed to create follower");

    let following = create_test_user(&db, "cascade_following")
        .await
        .expect("Failed to create following user");

    let outcome = ensure_exists::<user_follows::Entity>(&db, follower.id, following.id)
        .await
        .expect("Failed to create follow");

    // Delete the follower user
    users::Entity::delete_by_id(follower.id)
        .exec(&db)
        .await
        .expect("Failed to delete follower");

    // Verify follow relationship was cascade deleted
    let follow_check = user_follows::Entity::find_by_id(outcome.relation.id)
        .one(&db)
        .await
        .expect("Query failed");
    assert!(follow_check.is_none());

    // Verify following user's follower count was decremented
    let following_after = users::Entity::find_by_id(following.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(following_after.follower_count, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
