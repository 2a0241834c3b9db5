//! Creation, resubmission and chain integrity

use crate::common::{scan, Hub};
use scanhub::scan::api::{LifecycleError, NewScan, ScanId, ScanState, ScanType};

#[tokio::test]
async fn test_new_scan_starts_in_init() {
    let hub = Hub::new().await;
    let created = hub
        .manager
        .create_scan(NewScan::new("sudo-1.8.6p7-21.el7", "sudo", ScanType::Newpkg).with_release("rhel-7"))
        .await
        .unwrap();

    assert_eq!(created.state, ScanState::Init);
    assert!(created.enabled);
    assert_eq!(hub.scan(created.id.0), created);
}

#[tokio::test]
async fn test_base_must_exist() {
    let hub = Hub::new().await;
    let result = hub
        .manager
        .create_scan(NewScan::new("sudo-1.8.6p7-22.el7", "sudo", ScanType::Errata).with_base(ScanId(99)))
        .await;
    assert!(matches!(result, Err(LifecycleError::NotFound { .. })));
}

#[tokio::test]
async fn test_resubmitted_base_scan_stays_disabled() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::ErrataBase, ScanState::Failed).enabled(false));

    let copy = hub.manager.resubmit(ScanId(1), Some(ScanId(1))).await.unwrap();
    assert!(!copy.enabled);
    assert_eq!(copy.base, None);
    assert_eq!(hub.scan(1).parent, Some(copy.id));
}

#[tokio::test]
async fn test_resubmit_then_cancel_restores_original() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Waived));

    let copy = hub.manager.resubmit(ScanId(1), None).await.unwrap();
    assert!(!hub.scan(1).enabled);

    hub.manager.on_started(copy.id).await.unwrap();
    let outcome = hub.manager.on_cancel_requested(copy.id).await.unwrap();
    assert_eq!(outcome.enabled, Some(ScanId(1)));
}

#[tokio::test]
async fn test_queries() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Passed).enabled(false).parent(2));
    hub.put(scan(2, ScanType::Errata, ScanState::Canceled).enabled(false));
    hub.put(scan(3, ScanType::Errata, ScanState::NeedsInspection));
    hub.put(scan(4, ScanType::ErrataBase, ScanState::Finished).enabled(false));

    let latest = hub
        .manager
        .latest_scan_of_package("libxml2", "rhel-7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, ScanId(3));

    let ids: Vec<ScanId> = hub
        .manager
        .all_scans_in_release(ScanId(3))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![ScanId(1), ScanId(3), ScanId(4)]);

    assert!(hub
        .manager
        .latest_scan_of_package("libxml2", "rhel-8")
        .await
        .unwrap()
        .is_none());
}
