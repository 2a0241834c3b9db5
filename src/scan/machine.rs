//! Scan State Machine
//!
//! Pure transition logic. Given a scan and an event, [`transition`] computes
//! the next state and the side effects the caller must carry out. Nothing
//! here touches storage, the task queue or the message bus.
//!
//! A transition whose next state equals the current one is reported as
//! [`Transition::Unchanged`]: no write, no notice, no cascade.

use strum_macros::IntoStaticStr;

use crate::scan::error::{LifecycleError, LifecycleResult};
use crate::scan::types::{AnalysisSummary, NoticeClass, ScanRecord, ScanState, ScanType};

/// Reason recorded when the task queue reports a failed or canceled task
pub const TASK_FAILED_REASON: &str = "Task failed.";

/// External signal applied to a single scan
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ScanEvent {
    /// Submitted to the scheduler
    Queued,
    /// Worker picked the task up
    Started,
    /// Analysis ended and results were processed
    AnalysisFinished(AnalysisSummary),
    /// Task failed or was canceled in the task queue
    TaskFailed { reason: String },
    /// Explicit cancel, e.g. a newer build was submitted
    CancelRequested,
    /// No unwaived defect group remains
    AllWaived { has_bugs: bool },
    /// A waiver on this scan was obsoleted
    WaiverInvalidated,
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn task_failed() -> Self {
        ScanEvent::TaskFailed {
            reason: TASK_FAILED_REASON.to_string(),
        }
    }
}

/// Work the caller performs after a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Persist,
    /// Refresh `last_access`
    TouchAccess,
    /// Publish a state notice, if notifications are enabled
    Notify(NoticeClass),
    CascadeFail { reason: String },
    CascadeCancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Changed {
        from: ScanState,
        to: ScanState,
        effects: Vec<SideEffect>,
    },
}

impl Transition {
    pub fn next_state(&self, current: ScanState) -> ScanState {
        match self {
            Transition::Unchanged => current,
            Transition::Changed { to, .. } => *to,
        }
    }

    pub fn effects(&self) -> &[SideEffect] {
        match self {
            Transition::Unchanged => &[],
            Transition::Changed { effects, .. } => effects,
        }
    }
}

/// Notice class for a scan entering `state`; base scans are never surfaced
pub fn notice_for(scan: &ScanRecord, state: ScanState) -> Option<NoticeClass> {
    if scan.scan_type == ScanType::ErrataBase {
        None
    } else {
        Some(state.notice_class())
    }
}

/// Compute the transition for `event` on `scan`
pub fn transition(scan: &ScanRecord, event: &ScanEvent) -> LifecycleResult<Transition> {
    let to = match next_state(scan, event) {
        Some(to) => to,
        None => return Err(invalid(scan, event)),
    };

    if to == scan.state {
        log::debug!(
            "Scan {} already {}, ignoring {}",
            scan.id,
            scan.state,
            event.name()
        );
        return Ok(Transition::Unchanged);
    }

    if !accepts(scan.state, event) {
        return Err(invalid(scan, event));
    }

    let mut effects = vec![SideEffect::Persist];
    if matches!(
        event,
        ScanEvent::AnalysisFinished(_) | ScanEvent::AllWaived { .. } | ScanEvent::WaiverInvalidated
    ) {
        effects.push(SideEffect::TouchAccess);
    }
    if let Some(class) = notice_for(scan, to) {
        effects.push(SideEffect::Notify(class));
    }
    match event {
        ScanEvent::TaskFailed { reason } => effects.push(SideEffect::CascadeFail {
            reason: reason.clone(),
        }),
        ScanEvent::CancelRequested => effects.push(SideEffect::CascadeCancel),
        _ => {}
    }

    Ok(Transition::Changed {
        from: scan.state,
        to,
        effects,
    })
}

/// Apply `event` to a copy of `scan`, state only
pub fn apply(scan: &ScanRecord, event: &ScanEvent) -> LifecycleResult<ScanRecord> {
    let transition = transition(scan, event)?;
    let mut next = scan.clone();
    next.state = transition.next_state(scan.state);
    Ok(next)
}

// Candidate state by scan type and event; None when the type can never take the event
fn next_state(scan: &ScanRecord, event: &ScanEvent) -> Option<ScanState> {
    match event {
        ScanEvent::Queued => Some(ScanState::Queued),
        ScanEvent::Started if scan.is_base_scan() => Some(ScanState::BaseScanning),
        ScanEvent::Started => Some(ScanState::Scanning),
        ScanEvent::AnalysisFinished(summary) => {
            if !scan.is_target() {
                Some(ScanState::Finished)
            } else if summary.unwaived_groups == 0 {
                Some(ScanState::Passed)
            } else {
                Some(ScanState::NeedsInspection)
            }
        }
        ScanEvent::TaskFailed { .. } => Some(ScanState::Failed),
        ScanEvent::CancelRequested => Some(ScanState::Canceled),
        ScanEvent::AllWaived { .. } if !scan.is_target() => None,
        ScanEvent::AllWaived { has_bugs: true } => Some(ScanState::BugConfirmed),
        ScanEvent::AllWaived { has_bugs: false } => Some(ScanState::Waived),
        ScanEvent::WaiverInvalidated if !scan.is_target() => None,
        ScanEvent::WaiverInvalidated => match scan.state {
            ScanState::Waived | ScanState::BugConfirmed | ScanState::Disputed => {
                Some(ScanState::Disputed)
            }
            // nothing was waived yet
            ScanState::NeedsInspection => Some(ScanState::NeedsInspection),
            _ => None,
        },
    }
}

// Source states from which the event may change the state
/// Whether a scan in `from` may take `event` at all
pub fn accepts(from: ScanState, event: &ScanEvent) -> bool {
    match event {
        ScanEvent::Queued => from == ScanState::Init,
        ScanEvent::Started => matches!(from, ScanState::Init | ScanState::Queued),
        ScanEvent::AnalysisFinished(_) | ScanEvent::TaskFailed { .. } => from.is_in_progress(),
        ScanEvent::CancelRequested => true,
        ScanEvent::AllWaived { .. } => {
            matches!(from, ScanState::NeedsInspection | ScanState::Disputed)
        }
        ScanEvent::WaiverInvalidated => {
            matches!(from, ScanState::Waived | ScanState::BugConfirmed)
        }
    }
}

fn invalid(scan: &ScanRecord, event: &ScanEvent) -> LifecycleError {
    log::warn!(
        "Rejected {} for scan {} ({}, {})",
        event.name(),
        scan.id,
        scan.scan_type,
        scan.state
    );
    LifecycleError::InvalidTransition {
        scan_id: scan.id,
        state: scan.state,
        event: event.name().to_string(),
    }
}
