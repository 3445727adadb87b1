//! Integration tests for `PgSnapshotCommitter`.

use snapvault_core::commit::SnapshotCommitter;
use snapvault_core::error::DomainError;
use snapvault_core::manifest::AggregateManifest;
use snapvault_core::snapshot::Snapshot;
use snapvault_core::store::SnapshotStore;
use snapvault_store::{PgAggregateManifest, PgSnapshotCommitter, PgSnapshotStore};
use snapvault_test_support::fixed_now;
use sqlx::PgPool;
use uuid::Uuid;

fn make_snapshot(aggregate_id: Uuid, version: i64, total: i64) -> Snapshot {
    Snapshot {
        aggregate_id,
        aggregate_type: "test.tally".to_string(),
        version,
        payload: serde_json::json!({ "total": total, "entries": version }),
        taken_at: fixed_now(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_commit_writes_snapshot_and_manifest(pool: PgPool) {
    let committer = PgSnapshotCommitter::new(pool.clone());
    let aggregate_id = Uuid::new_v4();

    committer
        .commit(&make_snapshot(aggregate_id, 1, 5), 0)
        .await
        .unwrap();
    committer
        .commit(&make_snapshot(aggregate_id, 2, 7), 1)
        .await
        .unwrap();

    let stored = PgSnapshotStore::new(pool.clone())
        .get(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, make_snapshot(aggregate_id, 2, 7));
    let recorded = PgAggregateManifest::new(pool)
        .get_version(aggregate_id)
        .await
        .unwrap();
    assert_eq!(recorded, Some(2));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_stale_commit_writes_nothing(pool: PgPool) {
    let committer = PgSnapshotCommitter::new(pool.clone());
    let aggregate_id = Uuid::new_v4();
    committer
        .commit(&make_snapshot(aggregate_id, 1, 5), 0)
        .await
        .unwrap();

    let result = committer
        .commit(&make_snapshot(aggregate_id, 1, 99), 0)
        .await;

    match result.unwrap_err() {
        DomainError::ConcurrencyConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    let stored = PgSnapshotStore::new(pool)
        .get(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.payload["total"], 5);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_commits_keep_only_the_winner(pool: PgPool) {
    let committer = PgSnapshotCommitter::new(pool.clone());
    let aggregate_id = Uuid::new_v4();
    let first = make_snapshot(aggregate_id, 1, 10);
    let second = make_snapshot(aggregate_id, 1, 20);

    let (a, b) = tokio::join!(committer.commit(&first, 0), committer.commit(&second, 0));

    let conflicts = [&a, &b]
        .iter()
        .filter(|result| matches!(result, Err(DomainError::ConcurrencyConflict { .. })))
        .count();
    assert_eq!(conflicts, 1);
    let winner = if a.is_ok() { first } else { second };
    let stored = PgSnapshotStore::new(pool.clone())
        .get(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, winner);
    let recorded = PgAggregateManifest::new(pool)
        .get_version(aggregate_id)
        .await
        .unwrap();
    assert_eq!(recorded, Some(1));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_remove_clears_snapshot_and_manifest(pool: PgPool) {
    let committer = PgSnapshotCommitter::new(pool.clone());
    let aggregate_id = Uuid::new_v4();
    committer
        .commit(&make_snapshot(aggregate_id, 1, 5), 0)
        .await
        .unwrap();

    committer.remove(aggregate_id).await.unwrap();

    assert!(
        PgSnapshotStore::new(pool.clone())
            .get(aggregate_id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        PgAggregateManifest::new(pool)
            .get_version(aggregate_id)
            .await
            .unwrap(),
        None
    );
}
