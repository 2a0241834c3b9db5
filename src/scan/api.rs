//! Scan API
//!
//! Public surface of the scan lifecycle. Other modules and integration
//! tests import from here rather than from the internal modules.

// Entry points
pub use crate::scan::manager::{EventOutcome, LifecycleManager, LifecyclePorts};

// Errors
pub use crate::scan::error::{LifecycleError, LifecycleResult};
pub use crate::scan::ports::{ResultsError, StoreError, TaskError};

// Records and states
pub use crate::scan::types::{
    AnalysisSummary, NewScan, NoticeClass, ScanId, ScanRecord, ScanState, ScanType, TaskId,
    WaiverTimeliness,
};

// Transition rules and cascades
pub use crate::scan::cascade::{CascadeOutcome, CascadeResolver, BASE_FAILED_REASON};
pub use crate::scan::machine::{ScanEvent, SideEffect, Transition, TASK_FAILED_REASON};
pub use crate::scan::overdue::{overdue_window, waived_on_time};

// Collaborators
pub use crate::scan::memory::{Fixture, MemoryResults, MemoryScanStore, MemoryTaskQueue};
pub use crate::scan::ports::{
    ConfigPort, NotificationPort, ParentBinding, PersistencePort, ResultsPort, ScanQuery,
    TaskPort, TaskState,
};
pub use crate::scan::query::ScanFilter;
