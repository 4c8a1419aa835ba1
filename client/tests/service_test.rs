//! Integration tests for the catalog service and its optimistic protocol.

mod common;

use common::{permissive_policy, persisted, seed_items, service, service_with, ScriptedMirror};
use shelf_client::{Bootstrap, ClientError, LocalStore, MemoryStore};
use shelf_engine::{
    BookChanges, BookDraft, BookId, BookRecord, Error, MutationKind, Outcome, Reconciliation,
};
use std::collections::HashSet;
use std::sync::Arc;

fn slot_with(books: &[BookRecord]) -> MemoryStore {
    let local = MemoryStore::new();
    local.save(books).unwrap();
    local
}

async fn wait_until_in_flight(service: &shelf_client::CatalogService, id: &BookId) {
    while !service.is_in_flight(id).await {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn initialize_seeds_empty_slot() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new().with_seed(seed_items(20)));
    let service = service(&local, &mirror);

    let bootstrap = service.initialize().await.unwrap();

    assert_eq!(bootstrap, Bootstrap::Seeded(12));
    let books = service.books().await;
    assert_eq!(books.len(), 12);
    assert_eq!(books[0].id, BookId::Num(1));
    assert_eq!(books[0].author, "Unknown author");
    assert_eq!(books[0].genre, "Other");
    assert_eq!(books[0].description.as_deref(), Some("Seed body 1"));
    assert_eq!(books[0].year, None);
    assert_eq!(persisted(&local), books);
}

#[tokio::test]
async fn initialize_prefers_local_slot() {
    let local = slot_with(&[BookRecord::new("tmp-9", "Kept Book", "Someone")]);
    let mirror = Arc::new(ScriptedMirror::new().with_seed(seed_items(20)));
    let service = service(&local, &mirror);

    let bootstrap = service.initialize().await.unwrap();

    assert_eq!(bootstrap, Bootstrap::Restored(1));
    assert_eq!(service.books().await[0].title, "Kept Book");
    assert!(mirror.calls().is_empty());
}

#[tokio::test]
async fn initialize_treats_malformed_slot_as_empty() {
    let local = MemoryStore::with_contents("[{\"oops\"");
    let mirror = Arc::new(ScriptedMirror::new().with_seed(seed_items(3)));
    let service = service(&local, &mirror);

    assert_eq!(service.initialize().await.unwrap(), Bootstrap::Seeded(3));
    assert_eq!(persisted(&local).len(), 3);
}

#[tokio::test]
async fn initialize_without_seed_starts_empty() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);

    let bootstrap = service.initialize().await.unwrap();

    assert!(matches!(bootstrap, Bootstrap::Unavailable(_)));
    assert!(service.books().await.is_empty());
    assert!(local.contents().is_none());
}

#[tokio::test]
async fn seed_limit_is_configurable() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new().with_seed(seed_items(20)));
    let service = service(&local, &mirror).with_seed_limit(5);

    assert_eq!(service.initialize().await.unwrap(), Bootstrap::Seeded(5));
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_adopts_server_id() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new());
    mirror.queue_server_id(42u64);
    let service = service(&local, &mirror);

    let outcome = service
        .create(BookDraft::new("New Book", "A"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Committed {
            kind: MutationKind::Create,
            id: BookId::Num(42),
            reconciliation: Some(Reconciliation::Replaced {
                provisional: BookId::from("tmp-1"),
            }),
        }
    );
    let expected = vec![BookRecord::new(42u64, "New Book", "A")];
    assert_eq!(service.books().await, expected);
    assert_eq!(persisted(&local), expected);
    assert_eq!(mirror.calls(), vec!["create tmp-1"]);
}

#[tokio::test]
async fn failed_create_is_removed() {
    let local = slot_with(&[BookRecord::new(1u64, "Existing", "A")]);
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);
    service.initialize().await.unwrap();
    let before = service.snapshot().await;

    mirror.set_failing(true);
    let outcome = service.create(BookDraft::new("Doomed", "B")).await.unwrap();

    assert!(outcome.is_rolled_back());
    assert_eq!(service.snapshot().await, before);
    assert_eq!(persisted(&local), before.books());
}

#[tokio::test]
async fn invalid_create_changes_nothing_and_skips_remote() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);

    let result = service.create(BookDraft::new("Hi", "")).await;

    match result {
        Err(ClientError::Engine(Error::Validation(issues))) => {
            let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
            assert_eq!(fields, vec!["title", "author"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(service.books().await.is_empty());
    assert!(mirror.calls().is_empty());
    assert!(local.contents().is_none());
}

#[tokio::test]
async fn repeated_server_id_keeps_ids_unique() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new());
    mirror.queue_server_id(101u64);
    mirror.queue_server_id(101u64);
    let service = service(&local, &mirror);

    service.create(BookDraft::new("First", "A")).await.unwrap();
    let outcome = service.create(BookDraft::new("Second", "A")).await.unwrap();

    assert!(matches!(
        outcome,
        Outcome::Committed {
            reconciliation: Some(Reconciliation::Conflict { .. }),
            ..
        }
    ));
    let ids: HashSet<_> = service.books().await.into_iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&BookId::Num(101)));
    assert!(ids.contains(&BookId::from("tmp-2")));
}

#[tokio::test]
async fn concurrent_creates_keep_ids_unique() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);

    let (a, b, c) = futures::join!(
        service.create(BookDraft::new("Alpha", "A")),
        service.create(BookDraft::new("Bravo", "B")),
        service.create(BookDraft::new("Charlie", "C")),
    );

    assert!(a.unwrap().is_committed());
    assert!(b.unwrap().is_committed());
    assert!(c.unwrap().is_committed());
    let books = service.books().await;
    let ids: HashSet<_> = books.iter().map(|b| &b.id).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(persisted(&local), books);
}

// ============================================================================
// Update and delete
// ============================================================================

#[tokio::test]
async fn failed_update_restores_snapshot() {
    let local = slot_with(&[BookRecord::new("a", "X", "")]);
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service_with(permissive_policy(), &local, &mirror);
    service.initialize().await.unwrap();
    let before = service.snapshot().await;

    mirror.set_failing(true);
    let outcome = service
        .update(&BookId::from("a"), BookChanges::default().title("Y"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::RolledBack {
            kind: MutationKind::Update,
            id: BookId::from("a"),
        }
    );
    assert_eq!(service.snapshot().await, before);
    assert_eq!(persisted(&local), before.books());
}

#[tokio::test]
async fn update_merges_only_given_fields() {
    let original = BookRecord::new(7u64, "Dune", "Frank Herbert")
        .with_year(1965)
        .with_genre("Sci-Fi")
        .with_description("Spice");
    let local = slot_with(&[original.clone()]);
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);
    service.initialize().await.unwrap();

    let outcome = service
        .update(&BookId::Num(7), BookChanges::default().year(None))
        .await
        .unwrap();

    assert!(outcome.is_committed());
    let updated = service.get(&BookId::Num(7)).await.unwrap();
    assert_eq!(updated.year, None);
    assert_eq!(updated.title, original.title);
    assert_eq!(updated.genre, original.genre);
    assert_eq!(updated.description, original.description);
    assert_eq!(mirror.calls(), vec!["update 7"]);
}

#[tokio::test]
async fn missing_ids_are_noops_without_remote_calls() {
    let local = slot_with(&[BookRecord::new("a", "Alpha", "A")]);
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);
    service.initialize().await.unwrap();
    let before = service.snapshot().await;

    let deleted = service.delete(&BookId::from("missing-id")).await.unwrap();
    let updated = service
        .update(&BookId::from("missing-id"), BookChanges::default().title("Whatever"))
        .await
        .unwrap();

    assert_eq!(deleted, Outcome::NoOp);
    assert_eq!(updated, Outcome::NoOp);
    assert_eq!(service.snapshot().await, before);
    assert!(mirror.calls().is_empty());
}

#[tokio::test]
async fn failed_delete_reinserts_in_place() {
    let books = vec![
        BookRecord::new(1u64, "One", "A"),
        BookRecord::new(2u64, "Two", "A"),
        BookRecord::new(3u64, "Three", "A"),
    ];
    let local = slot_with(&books);
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);
    service.initialize().await.unwrap();

    mirror.set_failing(true);
    let outcome = service.delete(&BookId::Num(2)).await.unwrap();

    assert!(outcome.is_rolled_back());
    assert_eq!(service.books().await, books);
    assert_eq!(persisted(&local), books);
}

#[tokio::test]
async fn delete_clears_edit_target() {
    let local = slot_with(&[BookRecord::new(1u64, "One", "A")]);
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);
    service.initialize().await.unwrap();

    assert!(service.edit(&BookId::Num(1)).await.is_some());
    service.delete(&BookId::Num(1)).await.unwrap();

    assert_eq!(service.edit_target().await, None);
}

// ============================================================================
// Interleaving
// ============================================================================

#[tokio::test]
async fn in_flight_record_rejects_second_mutation() {
    let local = slot_with(&[
        BookRecord::new("a", "Alpha", "A"),
        BookRecord::new("b", "Bravo", "B"),
    ]);
    let (mirror, gate) = ScriptedMirror::new().with_held_deletes();
    let mirror = Arc::new(mirror);
    let service = Arc::new(service(&local, &mirror));
    service.initialize().await.unwrap();

    let pending = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.delete(&BookId::from("a")).await }
    });
    wait_until_in_flight(&service, &BookId::from("a")).await;

    let result = service
        .update(&BookId::from("a"), BookChanges::default().title("Again"))
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Engine(Error::MutationInFlight(ref id))) if *id == BookId::from("a")
    ));

    gate.add_permits(1);
    let outcome = pending.await.unwrap().unwrap();
    assert!(outcome.is_committed());
    assert_eq!(service.books().await.len(), 1);
}

#[tokio::test]
async fn rollback_keeps_interleaved_changes_to_other_records() {
    let local = slot_with(&[
        BookRecord::new("a", "Alpha", "A"),
        BookRecord::new("b", "Bravo", "B"),
    ]);
    let (mirror, gate) = ScriptedMirror::new().with_held_deletes();
    let mirror = Arc::new(mirror);
    let service = Arc::new(service(&local, &mirror));
    service.initialize().await.unwrap();

    let pending = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.delete(&BookId::from("a")).await }
    });
    wait_until_in_flight(&service, &BookId::from("a")).await;

    // Committed while the delete is outstanding
    let outcome = service
        .update(&BookId::from("b"), BookChanges::default().title("Bravo Two"))
        .await
        .unwrap();
    assert!(outcome.is_committed());

    mirror.set_failing(true);
    gate.add_permits(1);
    let outcome = pending.await.unwrap().unwrap();
    assert!(outcome.is_rolled_back());

    let expected = vec![
        BookRecord::new("a", "Alpha", "A"),
        BookRecord::new("b", "Bravo Two", "B"),
    ];
    assert_eq!(service.books().await, expected);
    assert_eq!(persisted(&local), expected);
}

#[tokio::test]
async fn overlapping_failed_deletes_restore_order() {
    let original = vec![
        BookRecord::new("a", "Alpha", "A"),
        BookRecord::new("b", "Bravo", "B"),
        BookRecord::new("c", "Charlie", "C"),
    ];
    let local = slot_with(&original);
    let (mirror, gate) = ScriptedMirror::new().with_held_deletes();
    let mirror = Arc::new(mirror);
    let service = Arc::new(service(&local, &mirror));
    service.initialize().await.unwrap();
    mirror.set_failing(true);

    let deletes: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.delete(&BookId::from(id)).await })
        })
        .collect();
    wait_until_in_flight(&service, &BookId::from("a")).await;
    wait_until_in_flight(&service, &BookId::from("b")).await;
    assert_eq!(service.books().await.len(), 1);

    gate.add_permits(2);
    for delete in deletes {
        assert!(delete.await.unwrap().unwrap().is_rolled_back());
    }

    assert_eq!(service.books().await, original);
    assert_eq!(persisted(&local), original);
}

#[tokio::test]
async fn refresh_is_refused_while_mutation_in_flight() {
    let local = slot_with(&[BookRecord::new("a", "Alpha", "A")]);
    let (mirror, gate) = ScriptedMirror::new().with_held_deletes();
    let mirror = Arc::new(mirror.with_seed(seed_items(4)));
    let service = Arc::new(service(&local, &mirror));
    service.initialize().await.unwrap();

    let pending = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.delete(&BookId::from("a")).await }
    });
    wait_until_in_flight(&service, &BookId::from("a")).await;

    let result = service.refresh().await;
    assert!(matches!(result, Err(ClientError::Engine(Error::Busy(1)))));

    gate.add_permits(1);
    pending.await.unwrap().unwrap();

    assert_eq!(service.refresh().await.unwrap(), 4);
    assert_eq!(persisted(&local).len(), 4);
}

// ============================================================================
// Persistence and publication
// ============================================================================

#[tokio::test]
async fn slot_matches_memory_after_each_mutation() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new().with_seed(seed_items(5)));
    let service = service(&local, &mirror);
    service.initialize().await.unwrap();

    service.create(BookDraft::new("Fresh", "A")).await.unwrap();
    assert_eq!(persisted(&local), service.books().await);

    service
        .update(&BookId::Num(3), BookChanges::default().author("Someone"))
        .await
        .unwrap();
    assert_eq!(persisted(&local), service.books().await);

    mirror.set_failing(true);
    service.delete(&BookId::Num(4)).await.unwrap();
    assert_eq!(persisted(&local), service.books().await);
}

#[tokio::test]
async fn persistence_failure_is_not_surfaced() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new());
    let service = service(&local, &mirror);

    local.set_failing(true);
    let outcome = service.create(BookDraft::new("Unsaved", "A")).await.unwrap();

    assert!(outcome.is_committed());
    assert_eq!(service.books().await.len(), 1);
    assert!(local.contents().is_none());
}

#[tokio::test]
async fn subscribers_see_every_change() {
    let local = MemoryStore::new();
    let mirror = Arc::new(ScriptedMirror::new().with_seed(seed_items(7)));
    let service = service(&local, &mirror);
    let mut updates = service.subscribe();

    service.initialize().await.unwrap();
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().total, 7);

    service.next_page().await;
    assert_eq!(updates.borrow_and_update().page, 1);

    service.create(BookDraft::new("Newest", "A")).await.unwrap();
    let listing = updates.borrow_and_update().clone();
    assert_eq!(listing.total, 8);
}
