//! Integration tests for circles and membership

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use notestock::circles;
use notestock::orm::{circle_members, circles as circles_orm};
use notestock::relation::{ensure_absent, ensure_exists, pair_exists};
use notestock::token::SequentialTokenSource;
use sea_orm::EntityTrait;

#[actix_rt::test]
#[serial]
async fn test_create_circle_enrolls_owner() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let owner = create_test_user(&db, "circle_owner").await.expect("owner");
    let tokens = SequentialTokenSource::new("circle");

    let circle = circles::create_circle(
        &db,
        &tokens,
        owner.id,
        &circles::NewCircle {
            name: "Writers".to_string(),
            description: Some("A circle for writers".to_string()),
        },
    )
    .await
    .expect("create_circle failed");

    assert_eq!(circle.token, "circle-1");
    assert_eq!(circle.owner_id, owner.id);

    // The owner is a member from the same transaction.
    assert!(
        pair_exists::<circle_members::Entity, _>(&db, owner.id, circle.id)
            .await
            .expect("pair_exists failed")
    );

    // Trigger keeps the denormalized count in step.
    let circle_after = circles_orm::Entity::find_by_id(circle.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("Circle not found");
    assert_eq!(circle_after.member_count, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_join_and_leave_circle() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let owner = create_test_user(&db, "join_owner").await.expect("owner");
    let joiner = create_test_user(&db, "joiner").await.expect("joiner");
    let circle = create_test_circle(&db, owner.id, "Open Circle")
        .await
        .expect("circle");

    let joined = ensure_exists::<circle_members::Entity>(&db, joiner.id, circle.id)
        .await
        .expect("join failed");
    assert!(joined.created);

    // Joining twice is a silent success.
    let again = ensure_exists::<circle_members::Entity>(&db, joiner.id, circle.id)
        .await
        .expect("repeat join failed");
    assert!(!again.created);

    let circle_after = circles_orm::Entity::find_by_id(circle.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("Circle not found");
    assert_eq!(circle_after.member_count, 2);

    let left = ensure_absent::<circle_members::Entity>(&db, joiner.id, circle.id)
        .await
        .expect("leave failed");
    assert!(left.deleted);

    // Leaving a circle you are not in is a silent success.
    let left_again = ensure_absent::<circle_members::Entity>(&db, joiner.id, circle.id)
        .await
        .expect("repeat leave failed");
    assert!(!left_again.deleted);

    let circle_after = circles_orm::Entity::find_by_id(circle.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("Circle not found");
    assert_eq!(circle_after.member_count, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_member_and_user_listings() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let owner = create_test_user(&db, "listing_owner").await.expect("owner");
    let member = create_test_user(&db, "listing_member").await.expect("member");
    let outsider = create_test_user(&db, "outsider").await.expect("outsider");

    let circle = create_test_circle(&db, owner.id, "Listed Circle")
        .await
        .expect("circle");

    ensure_exists::<circle_members::Entity>(&db, member.id, circle.id)
        .await
        .expect("join failed");

    let (members, total) = circles::list_members(&db, circle.id, 0, 10)
        .await
        .expect("list_members failed");
    assert_eq!(total, 2);
    assert!(members.iter().any(|u| u.id == owner.id));
    assert!(members.iter().any(|u| u.id == member.id));
    assert!(members.iter().all(|u| u.id != outsider.id));

    let my_circles = circles::list_for_user(&db, member.id)
        .await
        .expect("list_for_user failed");
    assert_eq!(my_circles.len(), 1);
    assert_eq!(my_circles[0].id, circle.id);

    let none = circles::list_for_user(&db, outsider.id)
        .await
        .expect("list_for_user failed");
    assert!(none.is_empty());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
