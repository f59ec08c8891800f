//! Integration tests for identity-backed user provisioning

mod common;
use serial_test::serial;

use common::database::*;
use notestock::identity::IdentityClaims;
use notestock::orm::users;
use notestock::user::{find_or_provision, Profile};
use sea_orm::EntityTrait;

fn claims(sub: &str, name: Option<&str>) -> IdentityClaims {
    IdentityClaims {
        sub: sub.to_string(),
        name: name.map(|n| n.to_string()),
        email: Some(format!("{}@example.com", sub)),
        avatar_url: None,
    }
}

#[actix_rt::test]
#[serial]
async fn test_first_sight_creates_user() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = find_or_provision(&db, &claims("auth0|alice", Some("Alice")))
        .await
        .expect("provisioning failed");

    assert_eq!(user.provider_sub, "auth0|alice");
    assert_eq!(user.name, "Alice");
    assert_eq!(user.email.as_deref(), Some("auth0|alice@example.com"));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_repeat_sight_reuses_row() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let first = find_or_provision(&db, &claims("auth0|bob", Some("Bob")))
        .await
        .expect("first provisioning failed");

    let second = find_or_provision(&db, &claims("auth0|bob", Some("Bob")))
        .await
        .expect("second provisioning failed");

    assert_eq!(first.id, second.id);

    let all = users::Entity::find().all(&db).await.expect("Query failed");
    assert_eq!(all.len(), 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_missing_name_falls_back_to_subject_prefix() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = find_or_provision(&db, &claims("github|1234567890abcdef", None))
        .await
        .expect("provisioning failed");

    assert_eq!(user.name, "github|12345");

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_profile_includes_counts() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = find_or_provision(&db, &claims("auth0|carol", Some("Carol")))
        .await
        .expect("provisioning failed");

    common::fixtures::create_test_note(&db, user.id, "Carols Note")
        .await
        .expect("note");

    let profile = Profile::get_by_id(&db, user.id)
        .await
        .expect("profile query failed")
        .expect("profile missing");

    assert_eq!(profile.name, "Carol");
    assert_eq!(profile.note_count, Some(1));
    assert_eq!(profile.stock_count, Some(0));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
