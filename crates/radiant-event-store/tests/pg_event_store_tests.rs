//! Integration tests for `PgEventStore`.
#![cfg(feature = "postgres-tests")]

use chrono::{TimeZone, Utc};
use radiant_core::error::DomainError;
use radiant_core::store::{EventStore, PendingEvent};
use radiant_event_store::PgEventStore;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `PendingEvent` with sensible defaults.
fn make_pending_event(event_type: &str) -> PendingEvent {
    PendingEvent {
        event_id: Uuid::new_v4(),
        event_type: event_type.to_owned(),
        schema_version: 1,
        payload: serde_json::to_vec(&serde_json::json!({"key": "value"})).unwrap(),
        metadata: br#"{"user_id":"u1"}"#.to_vec(),
        occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    }
}

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_nonexistent_aggregate_is_not_found(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();

    let result = store.load(aggregate_id).await;

    assert!(matches!(result, Err(DomainError::AggregateNotFound(id)) if id == aggregate_id));
}

// --- append + load round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_and_load_single_event(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let event = make_pending_event("test.happened");
    let expected = event.clone();

    store.append(aggregate_id, 0, vec![event]).await.unwrap();

    let loaded = store.load(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    let e = &loaded[0];
    assert_eq!(e.event_id, expected.event_id);
    assert_eq!(e.aggregate_id, aggregate_id);
    assert_eq!(e.event_type, expected.event_type);
    assert_eq!(e.payload, expected.payload);
    assert_eq!(e.metadata, expected.metadata);
    assert_eq!(e.sequence_number, 1);
    assert_eq!(e.schema_version, 1);
    assert_eq!(e.occurred_at, expected.occurred_at);
}

// --- ordering ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_three_events_to_new_aggregate_assigns_one_to_three(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();

    let stored = store
        .append(
            aggregate_id,
            0,
            vec![
                make_pending_event("a"),
                make_pending_event("b"),
                make_pending_event("c"),
            ],
        )
        .await
        .unwrap();

    let sequences: Vec<i64> = stored.iter().map(|e| e.sequence_number).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    let loaded = store.load(aggregate_id).await.unwrap();
    assert_eq!(loaded, stored);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_expected_version_conflicts_with_true_version(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    store
        .append(
            aggregate_id,
            0,
            vec![
                make_pending_event("a"),
                make_pending_event("b"),
                make_pending_event("c"),
            ],
        )
        .await
        .unwrap();

    let result = store
        .append(aggregate_id, 0, vec![make_pending_event("d")])
        .await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 3);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(store.load(aggregate_id).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_empty_list_is_noop(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let stored = store.append(Uuid::new_v4(), 5, Vec::new()).await.unwrap();

    assert!(stored.is_empty());
    assert!(store.load_all().await.unwrap().is_empty());
}

// --- incremental loads ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_from_and_global_tail(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    store
        .append(first, 0, vec![make_pending_event("a"), make_pending_event("b")])
        .await
        .unwrap();
    let second_events = store
        .append(second, 0, vec![make_pending_event("c")])
        .await
        .unwrap();

    let newer = store.load_from(first, 1).await.unwrap();
    let all = store.load_all().await.unwrap();
    let tail = store.load_all_from(all[1].global_position).await.unwrap();

    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].sequence_number, 2);
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].global_position < w[1].global_position));
    assert_eq!(tail, second_events);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ensure_schema_is_idempotent(pool: PgPool) {
    let store = PgEventStore::new(pool);

    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();
}
