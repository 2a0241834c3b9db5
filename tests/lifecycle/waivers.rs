//! Waiver submission, invalidation and deadlines

use chrono::Utc;

use crate::common::{scan, Hub};
use scanhub::scan::api::{
    AnalysisSummary, LifecycleError, ScanId, ScanState, ScanType, Transition, WaiverTimeliness,
};

fn all_waived(has_bugs: bool) -> AnalysisSummary {
    AnalysisSummary {
        unwaived_groups: 0,
        has_bugs,
    }
}

#[tokio::test]
async fn test_all_waived_without_bugs() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::NeedsInspection));
    hub.results.set_summary(ScanId(1), all_waived(false));

    let outcome = hub.manager.on_waiver_submitted(ScanId(1)).await.unwrap();
    assert_eq!(outcome.scan.state, ScanState::Waived);
}

#[tokio::test]
async fn test_disputed_scan_can_be_rewaived() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Disputed));
    hub.results.set_summary(ScanId(1), all_waived(true));

    let outcome = hub.manager.on_waiver_submitted(ScanId(1)).await.unwrap();
    assert_eq!(outcome.scan.state, ScanState::BugConfirmed);
}

#[tokio::test]
async fn test_waiver_on_user_scan_is_invalid() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::User, ScanState::Finished));
    hub.results.set_summary(ScanId(1), all_waived(false));

    assert!(matches!(
        hub.manager.on_waiver_submitted(ScanId(1)).await,
        Err(LifecycleError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_invalidation_disputes_waived_scan() {
    let mut hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Waived));

    let outcome = hub.manager.on_waiver_invalidated(ScanId(1)).await.unwrap();
    assert_eq!(outcome.scan.state, ScanState::Disputed);
    assert_eq!(hub.drain_notices().len(), 1);

    let saves = hub.store.save_count();
    let again = hub.manager.on_waiver_invalidated(ScanId(1)).await.unwrap();
    assert_eq!(again.transition, Transition::Unchanged);
    assert_eq!(again.scan.state, ScanState::Disputed);
    assert_eq!(hub.store.save_count(), saves);
    assert!(hub.drain_notices().is_empty());
}

#[tokio::test]
async fn test_invalidation_of_confirmed_bug() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Newpkg, ScanState::BugConfirmed));

    let outcome = hub.manager.on_waiver_invalidated(ScanId(1)).await.unwrap();
    assert_eq!(outcome.scan.state, ScanState::Disputed);
}

#[tokio::test]
async fn test_invalidation_while_running_is_rejected() {
    let hub = Hub::new().await;
    hub.put(scan(1, ScanType::Errata, ScanState::Scanning));

    assert!(matches!(
        hub.manager.on_waiver_invalidated(ScanId(1)).await,
        Err(LifecycleError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_waiver_deadlines() {
    let hub = Hub::new().await;
    let now = Utc::now();
    // rhel-7 allows 14 days, the default 7
    hub.put(scan(1, ScanType::Errata, ScanState::NeedsInspection).last_access_days_ago(10));
    hub.put(
        scan(2, ScanType::Errata, ScanState::NeedsInspection)
            .release(Some("rhel-6"))
            .last_access_days_ago(10),
    );
    hub.put(scan(3, ScanType::Errata, ScanState::Passed).last_access_days_ago(400));
    hub.put(
        scan(4, ScanType::Errata, ScanState::Failed)
            .enabled(false)
            .last_access_days_ago(400),
    );

    let answers = [
        (1, WaiverTimeliness::OnTime),
        (2, WaiverTimeliness::Overdue),
        (3, WaiverTimeliness::OnTime),
        (4, WaiverTimeliness::NotApplicable),
    ];
    for (id, expected) in answers {
        assert_eq!(
            hub.manager.waived_on_time(ScanId(id), now).await.unwrap(),
            expected,
            "scan {id}"
        );
    }
}

#[tokio::test]
async fn test_deadline_without_settings() {
    let hub = Hub::with_settings("").await;
    hub.put(scan(1, ScanType::Errata, ScanState::Disputed));

    assert!(matches!(
        hub.manager.waived_on_time(ScanId(1), Utc::now()).await,
        Err(LifecycleError::Configuration { .. })
    ));
}
