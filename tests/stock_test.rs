//! Integration tests for note stocking (bookmarks)

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use notestock::notes;
use notestock::orm::{notes as notes_orm, stocks};
use notestock::relation::{ensure_absent, ensure_exists};
use sea_orm::EntityTrait;

#[actix_rt::test]
#[serial]
async fn test_stock_and_unstock_note() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let reader = create_test_user(&db, "reader").await.expect("reader");
    let author = create_test_user(&db, "stock_author").await.expect("author");
    let note = create_test_note(&db, author.id, "Stockable").await.expect("note");

    let stocked = ensure_exists::<stocks::Entity>(&db, reader.id, note.id)
        .await
        .expect("Failed to stock");
    assert!(stocked.created);

    // Trigger keeps the denormalized count in step.
    let note_after = notes_orm::Entity::find_by_id(note.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("Note not found");
    assert_eq!(note_after.stock_count, 1);

    let unstocked = ensure_absent::<stocks::Entity>(&db, reader.id, note.id)
        .await
        .expect("Failed to unstock");
    assert!(unstocked.deleted);

    let note_after = notes_orm::Entity::find_by_id(note.id)
        .one(&db)
        .await
        .expect("Query failed")
        .expect("Note not found");
    assert_eq!(note_after.stock_count, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_stocked_listing_orders_by_recency() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let reader = create_test_user(&db, "list_reader").await.expect("reader");
    let author = create_test_user(&db, "list_author").await.expect("author");

    let first = create_test_note(&db, author.id, "First").await.expect("note");
    let second = create_test_note(&db, author.id, "Second").await.expect("note");
    let skipped = create_test_note(&db, author.id, "Skipped").await.expect("note");

    ensure_exists::<stocks::Entity>(&db, reader.id, first.id)
        .await
        .expect("stock first");
    ensure_exists::<stocks::Entity>(&db, reader.id, second.id)
        .await
        .expect("stock second");

    let (items, total) = notes::list_stocked_by(&db, reader.id, 0, 10)
        .await
        .expect("listing failed");

    assert_eq!(total, 2);
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|n| n.id != skipped.id));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_stock_rows_cascade_with_note() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let reader = create_test_user(&db, "cascade_reader").await.expect("reader");
    let author = create_test_user(&db, "cascade_author").await.expect("author");
    let note = create_test_note(&db, author.id, "Doomed").await.expect("note");

    let outcome = ensure_exists::<stocks::Entity>(&db, reader.id, note.id)
        .await
        .expect("Failed to stock");

    notes::delete_note(&db, note.id).await.expect("delete note");

    let stock_check = stocks::Entity::find_by_id(outcome.relation.id)
        .one(&db)
        .await
        .expect("Query failed");
    assert!(stock_check.is_none());

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
