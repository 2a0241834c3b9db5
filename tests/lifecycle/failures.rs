//! Task failures and the base-scan cascade

use crate::common::{scan, Hub};
use scanhub::scan::api::{LifecycleError, ScanId, ScanState, ScanType, TaskId, TaskState};

#[tokio::test]
async fn test_failure_disables_and_restores_previous() {
    let hub = Hub::new().await;
    // 2 replaced 1
    hub.put(scan(1, ScanType::Errata, ScanState::Waived).parent(2).enabled(false));
    hub.put(scan(2, ScanType::Errata, ScanState::Scanning).task(20));

    let outcome = hub
        .manager
        .on_task_failed_or_canceled(ScanId(2), TaskId(20))
        .await
        .unwrap();

    assert_eq!(outcome.scan.state, ScanState::Failed);
    assert!(!outcome.scan.enabled);
    assert_eq!(
        outcome.scan.failure_reason.as_deref(),
        Some("Scan failed due to: Task failed.")
    );
    assert_eq!(outcome.enabled, Some(ScanId(1)));
    assert!(hub.scan(1).enabled);
}

#[tokio::test]
async fn test_failure_without_successful_history() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Canceled).parent(2).enabled(false));
    hub.put(scan(2, ScanType::Errata, ScanState::Scanning).task(20));

    let outcome = hub
        .manager
        .on_task_failed_or_canceled(ScanId(2), TaskId(20))
        .await
        .unwrap();
    assert_eq!(outcome.enabled, None);
    assert!(hub.store.all().iter().all(|s| !s.enabled));
}

#[tokio::test]
async fn test_base_failure_fails_target() {
    let mut hub = Hub::new().await;
    hub.put(scan(5, ScanType::Errata, ScanState::BaseScanning).task(50).base(6));
    hub.put(scan(6, ScanType::ErrataBase, ScanState::BaseScanning).task(51).enabled(false));
    hub.store.bind_parent_task(TaskId(51), TaskId(50)).unwrap();

    let outcome = hub
        .manager
        .on_task_failed_or_canceled(ScanId(6), TaskId(51))
        .await
        .unwrap();

    assert_eq!(outcome.scan.state, ScanState::Failed);
    assert_eq!(outcome.changed, vec![ScanId(6), ScanId(5)]);

    let target = hub.scan(5);
    assert_eq!(target.state, ScanState::Failed);
    assert!(!target.enabled);
    assert_eq!(
        target.failure_reason.as_deref(),
        Some("Scan failed due to: Base scan failed.")
    );

    // parent task canceled without recursion
    assert_eq!(hub.tasks.cancel_calls(), vec![(TaskId(50), false)]);
    assert_eq!(hub.tasks.state_of(TaskId(50)), Some(TaskState::Canceled));

    // only the target is announced
    let notices = hub.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].scan_id, ScanId(5));
}

#[tokio::test]
async fn test_result_processing_error_is_reason() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Scanning).task(10));
    hub.results.set_failure(ScanId(1), "Unable to diff against base");

    let outcome = hub
        .manager
        .on_task_finished(ScanId(1), TaskId(10))
        .await
        .unwrap();
    assert_eq!(
        outcome.scan.failure_reason.as_deref(),
        Some("Scan failed due to: Unable to diff against base")
    );
}

#[tokio::test]
async fn test_missing_results_is_port_failure() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Scanning).task(10));

    let result = hub.manager.on_task_finished(ScanId(1), TaskId(10)).await;
    assert!(matches!(
        result,
        Err(LifecycleError::PortFailure { port: "results", .. })
    ));
    assert_eq!(hub.scan(1).state, ScanState::Scanning);
}

#[tokio::test]
async fn test_repeated_failure_is_noop() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Failed).task(10).enabled(false));
    let saves = hub.store.save_count();

    hub.manager
        .on_task_failed_or_canceled(ScanId(1), TaskId(10))
        .await
        .unwrap();
    assert_eq!(hub.store.save_count(), saves);
}

#[tokio::test]
async fn test_task_queue_outage_still_fails_target() {
    let hub = Hub::new().await;
    hub.put(scan(5, ScanType::Errata, ScanState::BaseScanning).task(50).base(6));
    hub.put(scan(6, ScanType::ErrataBase, ScanState::BaseScanning).task(51).enabled(false));
    hub.store.bind_parent_task(TaskId(51), TaskId(50)).unwrap();
    hub.tasks.set_unavailable(true);

    let result = hub
        .manager
        .on_task_failed_or_canceled(ScanId(6), TaskId(51))
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::PortFailure { port: "task", .. })
    ));
    assert_eq!(hub.scan(6).state, ScanState::Failed);
    assert_eq!(hub.scan(5).state, ScanState::Failed);
}
