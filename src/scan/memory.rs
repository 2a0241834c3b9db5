//! In-memory adapters
//!
//! Reference implementations of every lifecycle port backed by plain maps.
//! They drive the CLI over JSON fixtures and back the test suites. A
//! [`Fixture`] captures the whole state so it can be loaded and written back.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScannerVersion;
use crate::scan::ports::{
    ParentBinding, PersistencePort, ResultsError, ResultsPort, ScanQuery, StoreError, TaskError,
    TaskPort, TaskState,
};
use crate::scan::query::ScanFilter;
use crate::scan::types::{AnalysisSummary, NewScan, ScanId, ScanRecord, TaskId};

#[derive(Default)]
struct StoreInner {
    scans: BTreeMap<ScanId, ScanRecord>,
    task_parents: HashMap<TaskId, TaskId>,
    saves: usize,
}

/// Scan storage in a map, with task parent links for base scans
#[derive(Default)]
pub struct MemoryScanStore {
    inner: Mutex<StoreInner>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Backend {
            message: "scan store lock poisoned".to_string(),
        })
    }

    /// Insert or replace a record without counting it as a save
    pub fn insert(&self, scan: ScanRecord) -> Result<(), StoreError> {
        self.lock()?.scans.insert(scan.id, scan);
        Ok(())
    }

    /// Record that `child` was spawned by `parent` in the task queue
    pub fn bind_parent_task(&self, child: TaskId, parent: TaskId) -> Result<(), StoreError> {
        self.lock()?.task_parents.insert(child, parent);
        Ok(())
    }

    pub fn get(&self, scan_id: ScanId) -> Option<ScanRecord> {
        self.lock().ok()?.scans.get(&scan_id).cloned()
    }

    pub fn all(&self) -> Vec<ScanRecord> {
        self.lock()
            .map(|inner| inner.scans.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        self.lock().map(|inner| inner.saves).unwrap_or_default()
    }

    fn task_links(&self) -> Vec<(TaskId, TaskId)> {
        self.lock()
            .map(|inner| inner.task_parents.iter().map(|(c, p)| (*c, *p)).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PersistencePort for MemoryScanStore {
    async fn load(&self, scan_id: ScanId) -> Result<ScanRecord, StoreError> {
        self.lock()?
            .scans
            .get(&scan_id)
            .cloned()
            .ok_or(StoreError::Missing { scan_id })
    }

    async fn save(&self, scan: &ScanRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.scans.contains_key(&scan.id) {
            return Err(StoreError::Missing { scan_id: scan.id });
        }
        inner.scans.insert(scan.id, scan.clone());
        inner.saves += 1;
        Ok(())
    }

    async fn create(&self, scan: NewScan, now: DateTime<Utc>) -> Result<ScanRecord, StoreError> {
        let mut inner = self.lock()?;
        let next = inner.scans.keys().next_back().map_or(1, |id| id.0 + 1);
        let record = scan.into_record(ScanId(next), now);
        inner.scans.insert(record.id, record.clone());
        inner.saves += 1;
        Ok(record)
    }

    async fn find_child(&self, scan_id: ScanId) -> Result<Option<ScanRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .scans
            .values()
            .filter(|s| s.parent == Some(scan_id))
            .max_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_parent_binding(
        &self,
        scan_id: ScanId,
    ) -> Result<Option<ParentBinding>, StoreError> {
        let inner = self.lock()?;
        let scan = inner
            .scans
            .get(&scan_id)
            .ok_or(StoreError::Missing { scan_id })?;
        let Some(parent_task) = scan.task.and_then(|t| inner.task_parents.get(&t).copied())
        else {
            return Ok(None);
        };
        Ok(inner
            .scans
            .values()
            .find(|s| s.task == Some(parent_task))
            .map(|parent| ParentBinding {
                task: parent_task,
                scan: parent.id,
            }))
    }
}

#[async_trait]
impl ScanQuery for MemoryScanStore {
    async fn scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError> {
        Ok(self
            .lock()?
            .scans
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct QueueInner {
    tasks: BTreeMap<TaskId, TaskState>,
    cancel_calls: Vec<(TaskId, bool)>,
    unavailable: bool,
}

/// Task queue double recording every cancel request
#[derive(Default)]
pub struct MemoryTaskQueue {
    inner: Mutex<QueueInner>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueInner>, TaskError> {
        self.inner.lock().map_err(|_| TaskError::Unavailable {
            message: "task queue lock poisoned".to_string(),
        })
    }

    pub fn set_state(&self, task_id: TaskId, state: TaskState) -> Result<(), TaskError> {
        self.lock()?.tasks.insert(task_id, state);
        Ok(())
    }

    pub fn state_of(&self, task_id: TaskId) -> Option<TaskState> {
        self.lock().ok()?.tasks.get(&task_id).copied()
    }

    /// Make every call fail as if the hub were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut inner) = self.lock() {
            inner.unavailable = unavailable;
        }
    }

    pub fn cancel_calls(&self) -> Vec<(TaskId, bool)> {
        self.lock()
            .map(|inner| inner.cancel_calls.clone())
            .unwrap_or_default()
    }

    fn tasks(&self) -> Vec<(TaskId, TaskState)> {
        self.lock()
            .map(|inner| inner.tasks.iter().map(|(id, s)| (*id, *s)).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskPort for MemoryTaskQueue {
    async fn task_state(&self, task_id: TaskId) -> Result<TaskState, TaskError> {
        let inner = self.lock()?;
        if inner.unavailable {
            return Err(TaskError::Unavailable {
                message: "hub unreachable".to_string(),
            });
        }
        inner
            .tasks
            .get(&task_id)
            .copied()
            .ok_or(TaskError::UnknownTask { task_id })
    }

    async fn cancel_task(&self, task_id: TaskId, recursive: bool) -> Result<(), TaskError> {
        let mut inner = self.lock()?;
        if inner.unavailable {
            return Err(TaskError::Unavailable {
                message: "hub unreachable".to_string(),
            });
        }
        let state = inner
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskError::UnknownTask { task_id })?;
        if !matches!(
            state,
            TaskState::Closed | TaskState::Failed | TaskState::Canceled
        ) {
            *state = TaskState::Canceled;
        }
        inner.cancel_calls.push((task_id, recursive));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct ResultEntry {
    summary: AnalysisSummary,
    scanner: Option<ScannerVersion>,
    failure: Option<String>,
}

/// Canned analysis results per scan
#[derive(Default)]
pub struct MemoryResults {
    entries: Mutex<HashMap<ScanId, ResultEntry>>,
}

impl MemoryResults {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ScanId, ResultEntry>>, ResultsError> {
        self.entries.lock().map_err(|_| ResultsError::Processing {
            message: "results lock poisoned".to_string(),
        })
    }

    pub fn set_summary(&self, scan_id: ScanId, summary: AnalysisSummary) {
        if let Ok(mut entries) = self.lock() {
            entries.entry(scan_id).or_default().summary = summary;
        }
    }

    pub fn set_scanner(&self, scan_id: ScanId, scanner: ScannerVersion) {
        if let Ok(mut entries) = self.lock() {
            entries.entry(scan_id).or_default().scanner = Some(scanner);
        }
    }

    /// Make result processing for `scan_id` fail with `message`
    pub fn set_failure(&self, scan_id: ScanId, message: impl Into<String>) {
        if let Ok(mut entries) = self.lock() {
            entries.entry(scan_id).or_default().failure = Some(message.into());
        }
    }

    fn snapshot(&self) -> Vec<(ScanId, ResultEntry)> {
        self.lock()
            .map(|entries| entries.iter().map(|(id, e)| (*id, e.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultsPort for MemoryResults {
    async fn process(&self, scan: &ScanRecord) -> Result<AnalysisSummary, ResultsError> {
        let entries = self.lock()?;
        let entry = entries
            .get(&scan.id)
            .ok_or(ResultsError::NoResults { scan_id: scan.id })?;
        match &entry.failure {
            Some(message) => Err(ResultsError::Processing {
                message: message.clone(),
            }),
            None => Ok(entry.summary),
        }
    }

    async fn summary(&self, scan_id: ScanId) -> Result<AnalysisSummary, ResultsError> {
        self.lock()?
            .get(&scan_id)
            .map(|e| e.summary)
            .ok_or(ResultsError::NoResults { scan_id })
    }

    async fn scanner_of(&self, scan_id: ScanId) -> Result<Option<ScannerVersion>, ResultsError> {
        Ok(self.lock()?.get(&scan_id).and_then(|e| e.scanner.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFixture {
    pub id: TaskId,
    pub state: TaskState,
    #[serde(default)]
    pub parent: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFixture {
    pub scan: ScanId,
    #[serde(default)]
    pub unwaived_groups: usize,
    #[serde(default)]
    pub has_bugs: bool,
    #[serde(default)]
    pub scanner: Option<ScannerVersion>,
    #[serde(default)]
    pub failure: Option<String>,
}

/// Serializable snapshot of the in-memory adapters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub scans: Vec<ScanRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskFixture>,
    #[serde(default)]
    pub results: Vec<ResultFixture>,
}

impl Fixture {
    /// Populate fresh adapters from this fixture
    pub fn into_adapters(
        self,
    ) -> Result<(MemoryScanStore, MemoryTaskQueue, MemoryResults), StoreError> {
        let store = MemoryScanStore::new();
        let tasks = MemoryTaskQueue::new();
        let results = MemoryResults::new();

        for scan in self.scans {
            store.insert(scan)?;
        }
        for task in self.tasks {
            tasks
                .set_state(task.id, task.state)
                .map_err(|e| StoreError::Backend {
                    message: e.to_string(),
                })?;
            if let Some(parent) = task.parent {
                store.bind_parent_task(task.id, parent)?;
            }
        }
        for result in self.results {
            results.set_summary(
                result.scan,
                AnalysisSummary {
                    unwaived_groups: result.unwaived_groups,
                    has_bugs: result.has_bugs,
                },
            );
            if let Some(scanner) = result.scanner {
                results.set_scanner(result.scan, scanner);
            }
            if let Some(failure) = result.failure {
                results.set_failure(result.scan, failure);
            }
        }
        Ok((store, tasks, results))
    }

    /// Capture the current adapter contents
    pub fn capture(store: &MemoryScanStore, tasks: &MemoryTaskQueue, results: &MemoryResults) -> Self {
        let parents: HashMap<TaskId, TaskId> = store.task_links().into_iter().collect();
        let mut result_fixtures: Vec<ResultFixture> = results
            .snapshot()
            .into_iter()
            .map(|(scan, entry)| ResultFixture {
                scan,
                unwaived_groups: entry.summary.unwaived_groups,
                has_bugs: entry.summary.has_bugs,
                scanner: entry.scanner,
                failure: entry.failure,
            })
            .collect();
        result_fixtures.sort_by_key(|r| r.scan);

        Self {
            scans: store.all(),
            tasks: tasks
                .tasks()
                .into_iter()
                .map(|(id, state)| TaskFixture {
                    id,
                    state,
                    parent: parents.get(&id).copied(),
                })
                .collect(),
            results: result_fixtures,
        }
    }
}
