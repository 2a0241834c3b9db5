//! Scan Lifecycle Types
//!
//! Core data types shared across the lifecycle: identifiers, scan types and
//! states, the named state sets used by transition rules, and the
//! [`ScanRecord`] entity itself.
//!
//! Relations between scans (base, parent, child) are id-based and resolved
//! through the persistence port at call time; a record never embeds another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

use crate::scan::error::{LifecycleError, LifecycleResult};

/// Opaque scan identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(pub u64);

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque task identifier (a job in the external task queue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

/// Kind of scan submission
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ScanType {
    /// Regular update scan
    Errata,
    /// Mock build used only as a diff baseline
    ErrataBase,
    /// Scan posted by a user
    User,
    /// Base and target versions differ
    Rebase,
    /// New package, nothing to diff against
    Newpkg,
}

impl ScanType {
    /// Target scans are user-visible and go through waiving
    pub fn is_target(&self) -> bool {
        matches!(self, ScanType::Errata | ScanType::Rebase | ScanType::Newpkg)
    }

    /// Only these types may carry a base reference
    pub fn can_have_base(&self) -> bool {
        matches!(self, ScanType::Errata | ScanType::Rebase)
    }
}

/// Lifecycle state of a scan
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ScanState {
    Init,
    Queued,
    Scanning,
    BaseScanning,
    NeedsInspection,
    Waived,
    Passed,
    Finished,
    Failed,
    Canceled,
    Disputed,
    BugConfirmed,
}

impl ScanState {
    pub const IN_PROGRESS: [ScanState; 4] = [
        ScanState::Queued,
        ScanState::Scanning,
        ScanState::BaseScanning,
        ScanState::Init,
    ];

    pub const FINISHED_WELL: [ScanState; 5] = [
        ScanState::NeedsInspection,
        ScanState::Waived,
        ScanState::Passed,
        ScanState::Disputed,
        ScanState::BugConfirmed,
    ];

    pub const FINISHED_BAD: [ScanState; 2] = [ScanState::Failed, ScanState::Canceled];

    /// Processed states never count as overdue
    pub const PROCESSED: [ScanState; 2] = [ScanState::Passed, ScanState::Waived];

    pub fn is_in_progress(&self) -> bool {
        Self::IN_PROGRESS.contains(self)
    }

    pub fn is_finished_well(&self) -> bool {
        Self::FINISHED_WELL.contains(self)
    }

    pub fn is_finished_bad(&self) -> bool {
        Self::FINISHED_BAD.contains(self)
    }

    pub fn is_processed(&self) -> bool {
        Self::PROCESSED.contains(self)
    }

    /// Classification attached to state notices
    pub fn notice_class(&self) -> NoticeClass {
        if self.is_in_progress() {
            NoticeClass::Unfinished
        } else {
            NoticeClass::Finished
        }
    }
}

/// Classification sent alongside a state notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoticeClass {
    Finished,
    Unfinished,
}

/// One scan attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub nvr: String,
    pub package: String,
    /// Short release tag (e.g. `rhel-7`); user scans may have none
    #[serde(default)]
    pub release: Option<String>,
    pub scan_type: ScanType,
    pub state: ScanState,
    #[serde(default)]
    pub base: Option<ScanId>,
    #[serde(default)]
    pub parent: Option<ScanId>,
    /// Task bound to this scan in the task queue
    #[serde(default)]
    pub task: Option<TaskId>,
    pub enabled: bool,
    pub last_access: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl ScanRecord {
    pub fn is_target(&self) -> bool {
        self.scan_type.is_target()
    }

    pub fn is_base_scan(&self) -> bool {
        self.scan_type == ScanType::ErrataBase
    }

    /// Check the record-level invariants
    ///
    /// A base reference is only legal for types that diff against a base, a
    /// scan cannot be its own parent or base, and a failed or canceled scan
    /// is never enabled.
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.base.is_some() && !self.scan_type.can_have_base() {
            return Err(LifecycleError::InvalidRecord {
                message: format!(
                    "scan {} of type {} cannot have a base scan",
                    self.id, self.scan_type
                ),
            });
        }
        if self.base == Some(self.id) || self.parent == Some(self.id) {
            return Err(LifecycleError::InvalidRecord {
                message: format!("scan {} references itself", self.id),
            });
        }
        if self.enabled && self.state.is_finished_bad() {
            return Err(LifecycleError::InvalidRecord {
                message: format!("scan {} is {} but enabled", self.id, self.state),
            });
        }
        Ok(())
    }
}

/// Data needed to create a new scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScan {
    pub nvr: String,
    pub package: String,
    #[serde(default)]
    pub release: Option<String>,
    pub scan_type: ScanType,
    #[serde(default)]
    pub base: Option<ScanId>,
    #[serde(default)]
    pub parent: Option<ScanId>,
    #[serde(default)]
    pub task: Option<TaskId>,
    pub enabled: bool,
}

impl NewScan {
    pub fn new(nvr: impl Into<String>, package: impl Into<String>, scan_type: ScanType) -> Self {
        Self {
            nvr: nvr.into(),
            package: package.into(),
            release: None,
            scan_type,
            base: None,
            parent: None,
            task: None,
            enabled: scan_type != ScanType::ErrataBase,
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn with_base(mut self, base: ScanId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_parent(mut self, parent: ScanId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Materialise the record in INIT with the given id and timestamp
    pub fn into_record(self, id: ScanId, now: DateTime<Utc>) -> ScanRecord {
        ScanRecord {
            id,
            nvr: self.nvr,
            package: self.package,
            release: self.release,
            scan_type: self.scan_type,
            state: ScanState::Init,
            base: self.base,
            parent: self.parent,
            task: self.task,
            enabled: self.enabled,
            last_access: now,
            submitted_at: now,
            failure_reason: None,
        }
    }
}

/// Outcome of result processing for a finished analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Defect groups that still lack a valid waiver
    pub unwaived_groups: usize,
    /// At least one waived group is flagged as a confirmed bug
    pub has_bugs: bool,
}

/// Tri-state answer of the overdue computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum WaiverTimeliness {
    /// Failed and canceled scans never need waiving
    NotApplicable,
    OnTime,
    Overdue,
}
