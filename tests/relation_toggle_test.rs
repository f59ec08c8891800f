//! Integration tests for the idempotent toggle-relation service

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use notestock::orm::{stocks, user_follows};
use notestock::relation::{ensure_absent, ensure_exists, pair_exists};
use sea_orm::{entity::*, query::*, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

async fn count_stock_rows(db: &sea_orm::DatabaseConnection, user_id: i32, note_id: i32) -> usize {
    stocks::Entity::find()
        .filter(stocks::Column::UserId.eq(user_id))
        .filter(stocks::Column::NoteId.eq(note_id))
        .count(db)
        .await
        .expect("Count failed")
}

#[actix_rt::test]
#[serial]
async fn test_ensure_exists_twice_creates_once() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "toggler").await.expect("user");
    let author = create_test_user(&db, "author").await.expect("author");
    let note = create_test_note(&db, author.id, "A Note").await.expect("note");

    // First call inserts.
    let first = ensure_exists::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("first ensure_exists failed");
    assert!(first.created);
    assert_eq!(first.relation.user_id, user.id);
    assert_eq!(first.relation.note_id, note.id);

    // Second call is a silent no-op on the same row.
    let second = ensure_exists::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("second ensure_exists failed");
    assert!(!second.created);
    assert_eq!(second.relation.id, first.relation.id);

    assert_eq!(count_stock_rows(&db, user.id, note.id).await, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_ensure_absent_twice_deletes_once() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "absent_user").await.expect("user");
    let author = create_test_user(&db, "absent_author").await.expect("author");
    let note = create_test_note(&db, author.id, "A Note").await.expect("note");

    ensure_exists::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("setup ensure_exists failed");

    // First call deletes and returns the removed row.
    let first = ensure_absent::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("first ensure_absent failed");
    assert!(first.deleted);
    assert!(first.relation.is_some());

    // Second call is a silent success with nothing to report.
    let second = ensure_absent::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("second ensure_absent failed");
    assert!(!second.deleted);
    assert!(second.relation.is_none());

    assert_eq!(count_stock_rows(&db, user.id, note.id).await, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_round_trip_restores_initial_state() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "round_trip").await.expect("user");
    let author = create_test_user(&db, "round_author").await.expect("author");
    let note = create_test_note(&db, author.id, "A Note").await.expect("note");

    assert!(!pair_exists::<stocks::Entity, _>(&db, user.id, note.id)
        .await
        .expect("pair_exists failed"));

    ensure_exists::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("ensure_exists failed");
    ensure_absent::<stocks::Entity>(&db, user.id, note.id)
        .await
        .expect("ensure_absent failed");

    assert!(!pair_exists::<stocks::Entity, _>(&db, user.id, note.id)
        .await
        .expect("pair_exists failed"));
    assert_eq!(count_stock_rows(&db, user.id, note.id).await, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_concurrent_ensure_exists_single_row() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "racer").await.expect("user");
    let author = create_test_user(&db, "race_author").await.expect("author");
    let note = create_test_note(&db, author.id, "Contested Note").await.expect("note");

    // Launch N toggles for the same pair at once. Losing racers absorb the
    // unique violation and report created = false.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let user_id = user.id;
        let note_id = note.id;
        handles.push(actix_rt::spawn(async move {
            let pool = notestock::db::get_db_pool();
            ensure_exists::<stocks::Entity>(pool, user_id, note_id).await
        }));
    }

    let mut created_count = 0;
    for handle in handles {
        let outcome = handle
            .await
            .expect("spawned task panicked")
            .expect("ensure_exists failed under contention");
        if outcome.created {
            created_count += 1;
        }
        assert_eq!(outcome.relation.user_id, user.id);
        assert_eq!(outcome.relation.note_id, note.id);
    }

    assert_eq!(created_count, 1, "exactly one call should report created");
    assert_eq!(count_stock_rows(&db, user.id, note.id).await, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_distinct_pairs_do_not_interfere() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let alice = create_test_user(&db, "alice").await.expect("alice");
    let bob = create_test_user(&db, "bob").await.expect("bob");
    let carol = create_test_user(&db, "carol").await.expect("carol");

    ensure_exists::<user_follows::Entity>(&db, alice.id, bob.id)
        .await
        .expect("alice->bob failed");
    ensure_exists::<user_follows::Entity>(&db, alice.id, carol.id)
        .await
        .expect("alice->carol failed");

    // Removing one pair leaves the other untouched.
    ensure_absent::<user_follows::Entity>(&db, alice.id, bob.id)
        .await
        .expect("unfollow failed");

    assert!(!pair_exists::<user_follows::Entity, _>(&db, alice.id, bob.id)
        .await
        .expect("pair_exists failed"));
    assert!(pair_exists::<user_follows::Entity, _>(&db, alice.id, carol.id)
        .await
        .expect("pair_exists failed"));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
