//! Lifecycle Manager
//!
//! Entry points the application layer calls once per external event:
//! task-queue callbacks, cancel requests, waiver submissions and
//! invalidations, plus scan creation, resubmission and the overdue query.
//!
//! Each entry point loads the scan, asks the [state machine](crate::scan::machine)
//! for the transition and carries out its side effects, delegating failure
//! and cancel propagation to the [`CascadeResolver`].
//!
//! Entry points are serialised behind an event gate so one manager acts as
//! the single writer for every scan chain it touches. Hosts running several
//! managers against one store must provide equivalent row locking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::core::time::{Clock, SystemClock};
use crate::scan::cascade::{CascadeOutcome, CascadeResolver, MAX_CASCADE_DEPTH};
use crate::scan::error::{LifecycleError, LifecycleResult};
use crate::scan::machine::{self, ScanEvent, SideEffect, Transition};
use crate::scan::overdue;
use crate::scan::ports::{
    ConfigPort, NotificationPort, PersistencePort, ResultsError, ResultsPort, ScanQuery, TaskPort,
};
use crate::scan::query::{self, ScanFilter};
use crate::scan::types::{NewScan, ScanId, ScanRecord, TaskId, WaiverTimeliness};

/// Collaborators a manager is built from
pub struct LifecyclePorts {
    pub store: Arc<dyn PersistencePort>,
    pub query: Arc<dyn ScanQuery>,
    pub tasks: Arc<dyn TaskPort>,
    pub notifier: Arc<dyn NotificationPort>,
    pub results: Arc<dyn ResultsPort>,
    pub config: Arc<dyn ConfigPort>,
}

/// Result of one entry point call
#[derive(Debug)]
pub struct EventOutcome {
    /// The scan as stored after the event
    pub scan: ScanRecord,
    pub transition: Transition,
    /// Every scan whose state changed, cascades included
    pub changed: Vec<ScanId>,
    /// Scan re-enabled by the last-successful rollback
    pub enabled: Option<ScanId>,
}

pub struct LifecycleManager {
    store: Arc<dyn PersistencePort>,
    query: Arc<dyn ScanQuery>,
    tasks: Arc<dyn TaskPort>,
    results: Arc<dyn ResultsPort>,
    config: Arc<dyn ConfigPort>,
    clock: Arc<dyn Clock>,
    resolver: CascadeResolver,
    event_gate: Mutex<()>,
}

impl LifecycleManager {
    pub fn new(ports: LifecyclePorts) -> Self {
        Self::with_clock(ports, Arc::new(SystemClock))
    }

    pub fn with_clock(ports: LifecyclePorts, clock: Arc<dyn Clock>) -> Self {
        let resolver = CascadeResolver::new(
            ports.store.clone(),
            ports.tasks.clone(),
            ports.notifier,
            ports.config.clone(),
        );
        Self {
            store: ports.store,
            query: ports.query,
            tasks: ports.tasks,
            results: ports.results,
            config: ports.config,
            clock,
            resolver,
            event_gate: Mutex::new(()),
        }
    }

    /// Scan was handed to the scheduler
    pub async fn on_queued(&self, scan_id: ScanId) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let scan = self.store.load(scan_id).await?;
        self.apply(scan, ScanEvent::Queued).await
    }

    /// Worker started the analysis
    pub async fn on_started(&self, scan_id: ScanId) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let scan = self.store.load(scan_id).await?;
        self.apply(scan, ScanEvent::Started).await
    }

    /// Task bound to the scan ended; process its results
    ///
    /// A task that actually failed or was canceled fails the scan, as does a
    /// result-processing error (its message becomes the failure reason).
    pub async fn on_task_finished(
        &self,
        scan_id: ScanId,
        task_id: TaskId,
    ) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let scan = self.load_bound(scan_id, task_id).await?;

        let task_state = self.tasks.task_state(task_id).await?;
        if task_state.is_failed_or_canceled() {
            log::info!("{} of scan {} ended {}", task_id, scan_id, task_state);
            return self.apply(scan, ScanEvent::task_failed()).await;
        }

        match self.results.process(&scan).await {
            Ok(summary) => {
                log::debug!(
                    "Scan {} finished with {} unwaived groups",
                    scan_id,
                    summary.unwaived_groups
                );
                self.apply(scan, ScanEvent::AnalysisFinished(summary)).await
            }
            Err(ResultsError::Processing { message }) => {
                log::warn!("Processing results of scan {} failed: {}", scan_id, message);
                self.apply(scan, ScanEvent::TaskFailed { reason: message })
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Task bound to the scan failed or was canceled in the task queue
    pub async fn on_task_failed_or_canceled(
        &self,
        scan_id: ScanId,
        task_id: TaskId,
    ) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let scan = self.load_bound(scan_id, task_id).await?;
        self.apply(scan, ScanEvent::task_failed()).await
    }

    /// Explicit cancel, e.g. because a newer build was submitted
    pub async fn on_cancel_requested(&self, scan_id: ScanId) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let scan = self.store.load(scan_id).await?;
        self.apply(scan, ScanEvent::CancelRequested).await
    }

    /// A waiver was added; finalise the scan once nothing is left unwaived
    pub async fn on_waiver_submitted(&self, scan_id: ScanId) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let mut scan = self.store.load(scan_id).await?;
        let summary = self.results.summary(scan_id).await?;
        let event = ScanEvent::AllWaived {
            has_bugs: summary.has_bugs,
        };

        if summary.unwaived_groups == 0 {
            return self.apply(scan, event).await;
        }
        if !scan.is_target() || !machine::accepts(scan.state, &event) {
            log::warn!("Rejected waiver for scan {} in {}", scan_id, scan.state);
            return Err(LifecycleError::InvalidTransition {
                scan_id,
                state: scan.state,
                event: event.name().to_string(),
            });
        }

        log::debug!(
            "Scan {} still has {} unwaived groups",
            scan_id,
            summary.unwaived_groups
        );
        scan.last_access = self.clock.now();
        self.store.save(&scan).await?;
        Ok(EventOutcome {
            scan,
            transition: Transition::Unchanged,
            changed: Vec::new(),
            enabled: None,
        })
    }

    /// A waiver on this scan was obsoleted
    pub async fn on_waiver_invalidated(&self, scan_id: ScanId) -> LifecycleResult<EventOutcome> {
        let _gate = self.event_gate.lock().await;
        let scan = self.store.load(scan_id).await?;
        self.apply(scan, ScanEvent::WaiverInvalidated).await
    }

    pub async fn waived_on_time(
        &self,
        scan_id: ScanId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<WaiverTimeliness> {
        let scan = self.store.load(scan_id).await?;
        overdue::waived_on_time(&scan, now, self.config.as_ref())
    }

    /// Re-run the last-successful rollback for the chain starting at `scan_id`
    pub async fn enable_last_successful(&self, scan_id: ScanId) -> LifecycleResult<Option<ScanId>> {
        let _gate = self.event_gate.lock().await;
        let scan = self.store.load(scan_id).await?;
        self.resolver.enable_last_successful(&scan).await
    }

    /// Register a new scan in INIT
    pub async fn create_scan(&self, scan: NewScan) -> LifecycleResult<ScanRecord> {
        let _gate = self.event_gate.lock().await;
        self.create_locked(scan).await
    }

    /// Submit a fresh copy of a scan
    ///
    /// Base scans are recreated disabled and without a base; other scans are
    /// enabled and diff against `base`. The copy becomes the parent of the
    /// original, which is disabled, so the copy's child chain leads back to
    /// it for rollback. Only the newest scan of a chain can be resubmitted.
    pub async fn resubmit(
        &self,
        scan_id: ScanId,
        base: Option<ScanId>,
    ) -> LifecycleResult<ScanRecord> {
        let _gate = self.event_gate.lock().await;
        let mut original = self.store.load(scan_id).await?;
        if let Some(newer) = original.parent {
            log::warn!("Scan {} was already resubmitted as {}", scan_id, newer);
            return Err(LifecycleError::InvalidTransition {
                scan_id,
                state: original.state,
                event: "Resubmit".to_string(),
            });
        }

        let is_base = original.is_base_scan();
        let clone = NewScan {
            nvr: original.nvr.clone(),
            package: original.package.clone(),
            release: original.release.clone(),
            scan_type: original.scan_type,
            base: if is_base { None } else { base },
            parent: None,
            task: None,
            enabled: !is_base,
        };
        let created = self.create_locked(clone).await?;

        original.parent = Some(created.id);
        original.enabled = false;
        self.store.save(&original).await?;
        log::info!("Scan {} resubmitted as {}", scan_id, created.id);
        Ok(created)
    }

    /// Whether the scan's results come from the configured analyser version
    pub async fn is_actual(&self, scan_id: ScanId) -> LifecycleResult<bool> {
        let actual = self.config.actual_scanner()?;
        let used = self.results.scanner_of(scan_id).await?;
        Ok(used.as_ref() == Some(&actual))
    }

    /// Analysis command for a release
    pub fn scanning_command(&self, tag: &str) -> LifecycleResult<String> {
        Ok(self.config.scanning_command(tag)?)
    }

    pub async fn scans(&self, filter: &ScanFilter) -> LifecycleResult<Vec<ScanRecord>> {
        Ok(self.query.scans(filter).await?)
    }

    /// Newest target scan of `package` in `release`
    pub async fn latest_scan_of_package(
        &self,
        package: &str,
        release: &str,
    ) -> LifecycleResult<Option<ScanRecord>> {
        let filter = ScanFilter::new()
            .target_only()
            .by_release(release)
            .by_package(package);
        Ok(query::latest(self.query.scans(&filter).await?))
    }

    /// Every non-failed, non-canceled scan of the same package and release, oldest first
    pub async fn all_scans_in_release(&self, scan_id: ScanId) -> LifecycleResult<Vec<ScanRecord>> {
        let scan = self.store.load(scan_id).await?;
        let mut filter = ScanFilter::new().by_package(scan.package.clone());
        if let Some(release) = &scan.release {
            filter = filter.by_release(release.clone());
        }
        let mut scans: Vec<ScanRecord> = self
            .query
            .scans(&filter)
            .await?
            .into_iter()
            .filter(|s| s.release == scan.release && !s.state.is_finished_bad())
            .collect();
        scans.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(scans)
    }

    async fn create_locked(&self, scan: NewScan) -> LifecycleResult<ScanRecord> {
        let now = self.clock.now();
        // the store assigns the real id
        scan.clone().into_record(ScanId(0), now).validate()?;
        if let Some(base) = scan.base {
            self.store.load(base).await?;
        }
        if let Some(parent) = scan.parent {
            self.check_parent_chain(parent).await?;
        }

        let record = self.store.create(scan, now).await?;
        log::info!(
            "Created {} scan {} for {}",
            record.scan_type,
            record.id,
            record.nvr
        );
        Ok(record)
    }

    // Parent chain above a new scan must exist and be acyclic
    async fn check_parent_chain(&self, parent: ScanId) -> LifecycleResult<()> {
        let mut seen = std::collections::HashSet::new();
        let mut current = Some(parent);
        while let Some(id) = current {
            if !seen.insert(id) || seen.len() > MAX_CASCADE_DEPTH {
                return Err(LifecycleError::CycleDetected { scan_id: id });
            }
            current = self.store.load(id).await?.parent;
        }
        Ok(())
    }

    async fn load_bound(&self, scan_id: ScanId, task_id: TaskId) -> LifecycleResult<ScanRecord> {
        let scan = self.store.load(scan_id).await?;
        if scan.task != Some(task_id) {
            return Err(LifecycleError::InvalidRecord {
                message: format!("scan {scan_id} is not bound to {task_id}"),
            });
        }
        Ok(scan)
    }

    async fn apply(&self, mut scan: ScanRecord, event: ScanEvent) -> LifecycleResult<EventOutcome> {
        let transition = machine::transition(&scan, &event)?;
        let mut outcome = CascadeOutcome::default();

        if let Transition::Changed { from, to, effects } = &transition {
            let mut cascaded = false;
            for effect in effects {
                match effect {
                    SideEffect::TouchAccess => scan.last_access = self.clock.now(),
                    SideEffect::CascadeFail { reason } => {
                        self.resolver.fail(scan.clone(), reason, &mut outcome).await?;
                        cascaded = true;
                    }
                    SideEffect::CascadeCancel => {
                        self.resolver.cancel(scan.clone(), &mut outcome).await?;
                        cascaded = true;
                    }
                    // carried out by commit
                    SideEffect::Persist | SideEffect::Notify(_) => {}
                }
            }
            if !cascaded {
                scan.state = *to;
                self.resolver.commit(&scan, *from, &mut outcome).await?;
            }
        }

        let scan = self.store.load(scan.id).await?;
        Self::finish(scan, transition, outcome)
    }

    fn finish(
        scan: ScanRecord,
        transition: Transition,
        mut outcome: CascadeOutcome,
    ) -> LifecycleResult<EventOutcome> {
        if !outcome.is_clean() {
            for extra in outcome.errors.iter().skip(1) {
                log::error!("Additional side-channel failure for scan {}: {}", scan.id, extra);
            }
            return Err(outcome.errors.remove(0));
        }
        Ok(EventOutcome {
            scan,
            transition,
            changed: outcome.changed,
            enabled: outcome.enabled,
        })
    }
}
