//! Shared test harness
//!
//! Builds a lifecycle manager over the in-memory adapters with a private
//! notification manager, so tests can inspect stored scans, task-queue
//! calls and published notices.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use scanhub::config::HubSettings;
use scanhub::notifications::api::{BusNotifier, Event, EventFilter, EventReceiver, StateNotice};
use scanhub::scan::api::{
    LifecycleManager, LifecyclePorts, MemoryResults, MemoryScanStore, MemoryTaskQueue, NewScan,
    ScanId, ScanRecord, ScanState, ScanType, TaskId, TaskState,
};

pub const NOTIFYING: &str = r#"
[notifications]
send_bus_message = true

[waivers]
overdue_days = 7

[waivers.overdue_days_by_release]
rhel-7 = 14
"#;

pub struct Hub {
    pub manager: LifecycleManager,
    pub store: Arc<MemoryScanStore>,
    pub tasks: Arc<MemoryTaskQueue>,
    pub results: Arc<MemoryResults>,
    pub notices: EventReceiver,
}

impl Hub {
    pub async fn new() -> Self {
        Self::with_settings(NOTIFYING).await
    }

    pub async fn with_settings(settings: &str) -> Self {
        let settings = HubSettings::from_toml_str(settings, Path::new("hub.toml")).unwrap();
        let store = Arc::new(MemoryScanStore::new());
        let tasks = Arc::new(MemoryTaskQueue::new());
        let results = Arc::new(MemoryResults::new());
        let notifier = BusNotifier::standalone();
        let notices = notifier.manager().lock().await.subscribe(
            "tests".to_string(),
            EventFilter::StateOnly,
            "tests:hub".to_string(),
        );

        let manager = LifecycleManager::new(LifecyclePorts {
            store: store.clone(),
            query: store.clone(),
            tasks: tasks.clone(),
            notifier: Arc::new(notifier),
            results: results.clone(),
            config: Arc::new(settings),
        });
        Self {
            manager,
            store,
            tasks,
            results,
            notices,
        }
    }

    /// Store a scan directly, bypassing the lifecycle
    pub fn put(&self, scan: ScanBuilder) -> ScanRecord {
        let record = scan.build();
        if let Some(task) = record.task {
            if self.tasks.state_of(task).is_none() {
                self.tasks.set_state(task, TaskState::Open).unwrap();
            }
        }
        self.store.insert(record.clone()).unwrap();
        record
    }

    pub fn scan(&self, id: u64) -> ScanRecord {
        self.store.get(ScanId(id)).unwrap()
    }

    /// Drain every notice published so far
    pub fn drain_notices(&mut self) -> Vec<StateNotice> {
        let mut notices = Vec::new();
        while let Some(event) = self.notices.try_recv() {
            if let Event::State(notice) = event {
                notices.push(notice);
            }
        }
        notices
    }
}

/// Test scan record builder
pub struct ScanBuilder {
    record: ScanRecord,
}

pub fn scan(id: u64, scan_type: ScanType, state: ScanState) -> ScanBuilder {
    let mut record = NewScan::new(format!("libxml2-2.9.1-{id}.el7"), "libxml2", scan_type)
        .with_release("rhel-7")
        .into_record(ScanId(id), Utc::now() - TimeDelta::days(30) + TimeDelta::hours(id as i64));
    record.state = state;
    ScanBuilder { record }
}

impl ScanBuilder {
    pub fn task(mut self, task: u64) -> Self {
        self.record.task = Some(TaskId(task));
        self
    }

    pub fn parent(mut self, parent: u64) -> Self {
        self.record.parent = Some(ScanId(parent));
        self
    }

    pub fn base(mut self, base: u64) -> Self {
        self.record.base = Some(ScanId(base));
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.record.enabled = enabled;
        self
    }

    pub fn release(mut self, release: Option<&str>) -> Self {
        self.record.release = release.map(str::to_string);
        self
    }

    pub fn last_access_days_ago(mut self, days: i64) -> Self {
        self.record.last_access = Utc::now() - TimeDelta::days(days);
        self
    }

    pub fn build(self) -> ScanRecord {
        self.record
    }
}
