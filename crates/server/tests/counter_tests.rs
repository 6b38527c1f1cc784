//! Quota counter behavior against every supported store.
//!
//! PostgreSQL runs require Docker; set SKIP_POSTGRES_TESTS=1 to skip them.

mod common;

use common::run_metadata_test_both;
use portal_core::CounterSnapshot;
use portal_metadata::repos::{CounterRepo, EnsureOutcome};
use portal_metadata::{CounterError, InitOutcome, MetadataStore, QuotaCounterService};
use std::collections::HashSet;
use std::sync::Arc;

async fn ready_service(
    store: Arc<dyn MetadataStore>,
    default_limit: i64,
) -> Arc<QuotaCounterService> {
    let service = QuotaCounterService::with_monitor(store, default_limit);
    assert_eq!(service.initialize().await, InitOutcome::Created);
    Arc::new(service)
}

/// Drive the counter to `count` through the public API.
async fn fill(service: &QuotaCounterService, count: i64) {
    for _ in 0..count {
        service.increment_count().await.unwrap();
    }
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    run_metadata_test_both(|store| async move {
        let first = ready_service(store.clone(), 200).await;
        fill(&first, 3).await;

        let second = QuotaCounterService::with_monitor(store.clone(), 999);
        assert_eq!(second.initialize().await, InitOutcome::AlreadyInitialized);
        assert_eq!(
            second.read_count_and_limit().await.unwrap(),
            CounterSnapshot::new(3, 200)
        );

        // Still exactly one record.
        assert!(store.get_counter().await.unwrap().is_some());
        assert_eq!(
            store.ensure_counter(1).await.unwrap(),
            EnsureOutcome::AlreadyExists
        );
    })
    .await;
}

#[tokio::test]
async fn test_last_seat_scenario() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 200).await;
        fill(&service, 199).await;

        assert_eq!(service.increment_count().await.unwrap(), 200);
        match service.increment_count().await {
            Err(CounterError::QuotaExceeded { count, limit }) => {
                assert_eq!(count, 200);
                assert_eq!(limit, 200);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
        assert_eq!(service.decrement_count().await.unwrap(), 199);
    })
    .await;
}

#[tokio::test]
async fn test_limit_zero_scenario() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 200).await;
        fill(&service, 5).await;

        assert_eq!(service.update_limit(0).await.unwrap(), 0);
        assert!(matches!(
            service.increment_count().await,
            Err(CounterError::QuotaExceeded { count: 5, limit: 0 })
        ));
        assert_eq!(service.decrement_count().await.unwrap(), 4);
    })
    .await;
}

#[tokio::test]
async fn test_decrement_floor() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 10).await;
        assert_eq!(service.decrement_count().await.unwrap(), 0);
        assert_eq!(service.decrement_count().await.unwrap(), 0);
        assert_eq!(service.read_count().await.unwrap(), 0);
    })
    .await;
}

#[tokio::test]
async fn test_limit_update_does_not_touch_count() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 10).await;
        fill(&service, 6).await;

        assert_eq!(service.update_limit(2).await.unwrap(), 2);
        assert_eq!(
            service.read_count_and_limit().await.unwrap(),
            CounterSnapshot::new(6, 2)
        );
        assert!(matches!(
            service.increment_count().await,
            Err(CounterError::QuotaExceeded { .. })
        ));
    })
    .await;
}

#[tokio::test]
async fn test_invalid_limit_rejected() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 10).await;
        assert!(matches!(
            service.update_limit(-1).await,
            Err(CounterError::InvalidArgument(_))
        ));
        assert_eq!(service.read_limit().await.unwrap(), 10);
    })
    .await;
}

#[tokio::test]
async fn test_contended_increments_stop_at_limit() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 20).await;
        fill(&service, 15).await;

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.increment_count().await })
            })
            .collect();

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(CounterError::QuotaExceeded { .. }) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(rejected, 7);
        assert_eq!(service.read_count().await.unwrap(), 20);
    })
    .await;
}

#[tokio::test]
async fn test_no_lost_updates() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 100).await;
        fill(&service, 10).await;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.increment_count().await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()), "duplicate count returned");
        }

        assert_eq!(seen, (11..=35).collect::<HashSet<i64>>());
        assert_eq!(service.read_count().await.unwrap(), 35);
    })
    .await;
}

#[tokio::test]
async fn test_mixed_traffic_keeps_invariant() {
    run_metadata_test_both(|store| async move {
        let service = ready_service(store, 8).await;

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    if i % 3 == 0 {
                        service.decrement_count().await.map(|_| ())
                    } else {
                        match service.increment_count().await {
                            Err(CounterError::QuotaExceeded { .. }) => Ok(()),
                            other => other.map(|_| ()),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
            let snapshot = service.read_count_and_limit().await.unwrap();
            assert!(snapshot.count >= 0);
            assert!(snapshot.count <= snapshot.limit);
        }
    })
    .await;
}
