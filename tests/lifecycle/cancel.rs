//! Cancellation and rollback

use crate::common::{scan, Hub};
use scanhub::scan::api::{LifecycleError, ScanId, ScanState, ScanType, TaskId, TaskState, Transition};

#[tokio::test]
async fn test_cancel_running_scan() {
    let mut hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Passed).parent(2).enabled(false));
    hub.put(scan(2, ScanType::Errata, ScanState::Scanning).task(20));

    let outcome = hub.manager.on_cancel_requested(ScanId(2)).await.unwrap();

    assert_eq!(outcome.scan.state, ScanState::Canceled);
    assert!(!outcome.scan.enabled);
    assert_eq!(hub.tasks.state_of(TaskId(20)), Some(TaskState::Canceled));
    assert_eq!(outcome.enabled, Some(ScanId(1)));
    assert!(hub.scan(1).enabled);
    assert_eq!(hub.drain_notices().len(), 1);
}

#[tokio::test]
async fn test_cancel_twice_is_noop() {
    let mut hub = Hub::new().await;
    hub.put(scan(2, ScanType::Errata, ScanState::Scanning).task(20));

    hub.manager.on_cancel_requested(ScanId(2)).await.unwrap();
    hub.drain_notices();
    let saves = hub.store.save_count();
    let calls = hub.tasks.cancel_calls().len();

    let again = hub.manager.on_cancel_requested(ScanId(2)).await.unwrap();
    assert_eq!(again.transition, Transition::Unchanged);
    assert_eq!(hub.store.save_count(), saves);
    assert_eq!(hub.tasks.cancel_calls().len(), calls);
    assert!(hub.drain_notices().is_empty());
}

#[tokio::test]
async fn test_cancel_leaves_closed_task_alone() {
    let hub = Hub::new().await;
    hub.put(scan(2, ScanType::Errata, ScanState::NeedsInspection).task(20));
    hub.tasks.set_state(TaskId(20), TaskState::Closed).unwrap();

    hub.manager.on_cancel_requested(ScanId(2)).await.unwrap();
    assert!(hub.tasks.cancel_calls().is_empty());
    assert_eq!(hub.scan(2).state, ScanState::Canceled);
}

#[tokio::test]
async fn test_cancel_base_cancels_target() {
    let hub = Hub::new().await;
    hub.put(scan(5, ScanType::Errata, ScanState::BaseScanning).task(50).base(6));
    hub.put(scan(6, ScanType::ErrataBase, ScanState::BaseScanning).task(51));
    hub.store.bind_parent_task(TaskId(51), TaskId(50)).unwrap();

    let outcome = hub.manager.on_cancel_requested(ScanId(6)).await.unwrap();

    assert_eq!(outcome.changed, vec![ScanId(6), ScanId(5)]);
    assert_eq!(hub.scan(5).state, ScanState::Canceled);
    assert!(!hub.scan(5).enabled);
    assert_eq!(hub.tasks.state_of(TaskId(51)), Some(TaskState::Canceled));
    assert_eq!(hub.tasks.state_of(TaskId(50)), Some(TaskState::Canceled));
}

#[tokio::test]
async fn test_rollback_cycle_is_detected() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Failed).parent(3).enabled(false));
    hub.put(scan(2, ScanType::Errata, ScanState::Failed).parent(1).enabled(false));
    hub.put(scan(3, ScanType::Errata, ScanState::Scanning).parent(2));

    let result = hub.manager.on_cancel_requested(ScanId(3)).await;
    assert!(matches!(result, Err(LifecycleError::CycleDetected { .. })));
    // the cancel itself is kept
    assert_eq!(hub.scan(3).state, ScanState::Canceled);
}

#[tokio::test]
async fn test_enable_last_successful_on_demand() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::BugConfirmed).parent(2).enabled(false));
    hub.put(scan(2, ScanType::Errata, ScanState::Failed).enabled(false));

    assert_eq!(
        hub.manager.enable_last_successful(ScanId(2)).await.unwrap(),
        Some(ScanId(1))
    );
    assert!(hub.scan(1).enabled);
}
