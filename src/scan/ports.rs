//! Collaborator Ports
//!
//! The lifecycle core owns no storage, queue, bus or settings. Everything it
//! needs from the surrounding application is expressed as a trait here and
//! injected into [`LifecycleManager`](crate::scan::manager::LifecycleManager).
//!
//! Every call is treated as atomic: it either succeeds or returns an error.
//! Hosts that implement a port over the network own the timeout and retry
//! policy for it.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::config::{ConfigError, ScannerVersion};
use crate::notifications::api::{NotificationError, StateNotice};
use crate::scan::query::ScanFilter;
use crate::scan::types::{AnalysisSummary, NewScan, ScanId, ScanRecord, TaskId};

/// Persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No scan with id {scan_id}")]
    Missing { scan_id: ScanId },

    #[error("Storage backend error: {message}")]
    Backend { message: String },
}

/// Task queue failures
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Unknown task: {task_id}")]
    UnknownTask { task_id: TaskId },

    #[error("Task queue unavailable: {message}")]
    Unavailable { message: String },
}

/// Result processing failures; the message becomes the scan's failure reason
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("{message}")]
    Processing { message: String },

    #[error("No results for scan {scan_id}")]
    NoResults { scan_id: ScanId },
}

/// State of a task in the external task queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TaskState {
    Free,
    Assigned,
    Open,
    Closed,
    Interrupted,
    Canceled,
    Failed,
    Created,
}

impl TaskState {
    /// Tasks that have not finished and may still be canceled
    pub fn is_cancellable(&self) -> bool {
        matches!(self, TaskState::Free | TaskState::Created | TaskState::Open)
    }

    pub fn is_failed_or_canceled(&self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Canceled)
    }
}

/// A base scan's link to the target scan that spawned it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentBinding {
    /// Parent task in the task queue
    pub task: TaskId,
    /// Scan bound to the parent task
    pub scan: ScanId,
}

/// Scan storage
///
/// Hosts must serialise events touching the same scan chain (row lock or
/// single writer) since cascades read and write several related records.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn load(&self, scan_id: ScanId) -> Result<ScanRecord, StoreError>;

    async fn save(&self, scan: &ScanRecord) -> Result<(), StoreError>;

    /// Store a new scan and assign its id
    async fn create(&self, scan: NewScan, now: DateTime<Utc>) -> Result<ScanRecord, StoreError>;

    /// The scan whose parent is `scan_id`, if any
    async fn find_child(&self, scan_id: ScanId) -> Result<Option<ScanRecord>, StoreError>;

    /// Parent task of this scan's task and the scan bound to it
    async fn find_parent_binding(
        &self,
        scan_id: ScanId,
    ) -> Result<Option<ParentBinding>, StoreError>;
}

/// Shared filtering capability over stored scans
#[async_trait]
pub trait ScanQuery: Send + Sync {
    async fn scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError>;
}

/// Task queue
#[async_trait]
pub trait TaskPort: Send + Sync {
    async fn task_state(&self, task_id: TaskId) -> Result<TaskState, TaskError>;

    async fn cancel_task(&self, task_id: TaskId, recursive: bool) -> Result<(), TaskError>;
}

/// State notices (message bus or mail)
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn publish(&self, notice: StateNotice) -> Result<(), NotificationError>;
}

/// Analysis results and waiving service
#[async_trait]
pub trait ResultsPort: Send + Sync {
    /// Process the output of a finished analysis (diff against base included)
    async fn process(&self, scan: &ScanRecord) -> Result<AnalysisSummary, ResultsError>;

    /// Current waiving summary of an already processed scan
    async fn summary(&self, scan_id: ScanId) -> Result<AnalysisSummary, ResultsError>;

    /// Analyser that produced the scan's results
    async fn scanner_of(&self, scan_id: ScanId) -> Result<Option<ScannerVersion>, ResultsError>;
}

/// Hub settings
pub trait ConfigPort: Send + Sync {
    fn default_overdue_window(&self) -> Result<TimeDelta, ConfigError>;

    /// `Ok(None)` means no override exists for the release
    fn overdue_window_for_release(&self, tag: &str) -> Result<Option<TimeDelta>, ConfigError>;

    fn send_notifications_enabled(&self) -> bool;

    fn actual_scanner(&self) -> Result<ScannerVersion, ConfigError>;

    fn scanning_command(&self, tag: &str) -> Result<String, ConfigError>;
}
