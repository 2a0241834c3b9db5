//! Cascade Resolver
//!
//! Propagates failures and cancellations across related scans and restores
//! an enabled scan afterwards:
//!
//! - a target scan that fails or is canceled is disabled and the first
//!   well-finished scan down its child chain is enabled instead
//! - a base scan that fails cancels its parent task and fails the parent
//!   scan with [`BASE_FAILED_REASON`]
//! - a base scan that is canceled cancels the parent scan
//!
//! Chains are walked iteratively. Relations come from the persistence port
//! and are acyclic by construction; a revisited scan or a chain longer than
//! [`MAX_CASCADE_DEPTH`] yields [`LifecycleError::CycleDetected`].
//!
//! State changes are authoritative. Task cancellation and notices are side
//! channels: their failures are collected in [`CascadeOutcome::errors`] and
//! the cascade carries on.

use std::collections::HashSet;
use std::sync::Arc;

use crate::notifications::api::StateNotice;
use crate::scan::error::{LifecycleError, LifecycleResult};
use crate::scan::machine::notice_for;
use crate::scan::ports::{ConfigPort, NotificationPort, PersistencePort, TaskPort};
use crate::scan::types::{ScanId, ScanRecord, ScanState};

/// Reason given to a target scan whose base scan failed
pub const BASE_FAILED_REASON: &str = "Base scan failed.";

/// Upper bound on scans visited by a single cascade or chain walk
pub const MAX_CASCADE_DEPTH: usize = 64;

/// What a cascade touched
#[derive(Debug, Default)]
pub struct CascadeOutcome {
    /// Scans whose state changed, in order
    pub changed: Vec<ScanId>,
    /// Scan enabled by the last-successful rollback, if any
    pub enabled: Option<ScanId>,
    /// Side-channel failures (task queue, notices)
    pub errors: Vec<LifecycleError>,
}

impl CascadeOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Guards chain walks against cycles in bad data
struct ChainGuard {
    visited: HashSet<ScanId>,
}

impl ChainGuard {
    fn new() -> Self {
        Self {
            visited: HashSet::new(),
        }
    }

    fn enter(&mut self, scan_id: ScanId) -> LifecycleResult<()> {
        if !self.visited.insert(scan_id) || self.visited.len() > MAX_CASCADE_DEPTH {
            log::error!("Scan chain loops or is too deep at {}", scan_id);
            return Err(LifecycleError::CycleDetected { scan_id });
        }
        Ok(())
    }
}

pub struct CascadeResolver {
    store: Arc<dyn PersistencePort>,
    tasks: Arc<dyn TaskPort>,
    notifier: Arc<dyn NotificationPort>,
    config: Arc<dyn ConfigPort>,
}

impl CascadeResolver {
    pub fn new(
        store: Arc<dyn PersistencePort>,
        tasks: Arc<dyn TaskPort>,
        notifier: Arc<dyn NotificationPort>,
        config: Arc<dyn ConfigPort>,
    ) -> Self {
        Self {
            store,
            tasks,
            notifier,
            config,
        }
    }

    /// Mark `scan` FAILED and propagate
    pub async fn fail(
        &self,
        scan: ScanRecord,
        reason: &str,
        outcome: &mut CascadeOutcome,
    ) -> LifecycleResult<()> {
        let mut guard = ChainGuard::new();
        let mut scan = scan;
        let mut reason = reason.to_string();

        loop {
            guard.enter(scan.id)?;
            let previous = scan.state;
            scan.state = ScanState::Failed;

            if scan.is_target() {
                scan.enabled = false;
                scan.failure_reason = Some(format!("Scan failed due to: {reason}"));
                self.commit(&scan, previous, outcome).await?;
                outcome.enabled = self.enable_last_successful(&scan).await?;
                return Ok(());
            }

            scan.enabled = false;
            self.commit(&scan, previous, outcome).await?;

            let Some(binding) = self.store.find_parent_binding(scan.id).await? else {
                log::debug!("Scan {} has no parent task, cascade ends", scan.id);
                return Ok(());
            };
            log::debug!(
                "Base scan {} failed, failing parent scan {}",
                scan.id,
                binding.scan
            );
            if let Err(e) = self.tasks.cancel_task(binding.task, false).await {
                log::error!("Failed to cancel parent task {}: {}", binding.task, e);
                outcome.errors.push(e.into());
            }
            scan = self.store.load(binding.scan).await?;
            if scan.state.is_finished_bad() {
                log::debug!("Parent scan {} already {}", scan.id, scan.state);
                return Ok(());
            }
            reason = BASE_FAILED_REASON.to_string();
        }
    }

    /// Mark `scan` CANCELED, cancel its live task and propagate
    pub async fn cancel(&self, scan: ScanRecord, outcome: &mut CascadeOutcome) -> LifecycleResult<()> {
        let mut guard = ChainGuard::new();
        let mut scan = scan;

        loop {
            guard.enter(scan.id)?;
            let previous = scan.state;
            scan.state = ScanState::Canceled;
            scan.enabled = false;
            self.commit(&scan, previous, outcome).await?;
            self.cancel_scan_tasks(&scan, outcome).await?;

            if scan.is_target() {
                outcome.enabled = self.enable_last_successful(&scan).await?;
                return Ok(());
            }

            let Some(binding) = self.store.find_parent_binding(scan.id).await? else {
                log::debug!("Scan {} has no parent task, cascade ends", scan.id);
                return Ok(());
            };
            log::debug!(
                "Base scan {} canceled, canceling parent scan {}",
                scan.id,
                binding.scan
            );
            scan = self.store.load(binding.scan).await?;
            if scan.state == ScanState::Canceled {
                return Ok(());
            }
        }
    }

    /// Enable the first well-finished scan on the child chain starting at `scan`
    ///
    /// Returns `None` when no such scan exists; callers must tolerate a chain
    /// without any enabled scan.
    pub async fn enable_last_successful(
        &self,
        scan: &ScanRecord,
    ) -> LifecycleResult<Option<ScanId>> {
        let mut guard = ChainGuard::new();
        let mut current = Some(scan.clone());

        while let Some(mut candidate) = current {
            guard.enter(candidate.id)?;
            if candidate.state.is_finished_well() {
                candidate.enabled = true;
                self.store.save(&candidate).await?;
                log::info!(
                    "Enabled scan {} ({}) as last successful",
                    candidate.id,
                    candidate.state
                );
                return Ok(Some(candidate.id));
            }
            current = self.store.find_child(candidate.id).await?;
        }

        log::info!("No successful scan left in chain of {}", scan.id);
        Ok(None)
    }

    /// Persist `scan` and, if its state moved away from `previous`, publish a notice
    pub(crate) async fn commit(
        &self,
        scan: &ScanRecord,
        previous: ScanState,
        outcome: &mut CascadeOutcome,
    ) -> LifecycleResult<()> {
        self.store.save(scan).await?;
        if scan.state != previous {
            log::info!("Scan {} {} -> {}", scan.id, previous, scan.state);
            outcome.changed.push(scan.id);
            self.notify(scan, outcome).await;
        }
        Ok(())
    }

    async fn notify(&self, scan: &ScanRecord, outcome: &mut CascadeOutcome) {
        let Some(class) = notice_for(scan, scan.state) else {
            return;
        };
        if !self.config.send_notifications_enabled() {
            log::trace!("Notifications disabled, not announcing scan {}", scan.id);
            return;
        }
        let notice = StateNotice::new(scan, class);
        if let Err(e) = self.notifier.publish(notice).await {
            log::error!("Failed to publish state notice for scan {}: {}", scan.id, e);
            outcome.errors.push(e.into());
        }
    }

    // Cancel the scan's task and its parent task, both non-recursively, if still live
    async fn cancel_scan_tasks(
        &self,
        scan: &ScanRecord,
        outcome: &mut CascadeOutcome,
    ) -> LifecycleResult<()> {
        let Some(task) = scan.task else {
            return Ok(());
        };
        let state = match self.tasks.task_state(task).await {
            Ok(state) => state,
            Err(e) => {
                log::error!("Failed to query {}: {}", task, e);
                outcome.errors.push(e.into());
                return Ok(());
            }
        };
        if !state.is_cancellable() {
            log::debug!("{} is {}, nothing to cancel", task, state);
            return Ok(());
        }

        if let Err(e) = self.tasks.cancel_task(task, false).await {
            log::error!("Failed to cancel {}: {}", task, e);
            outcome.errors.push(e.into());
        }
        if let Some(binding) = self.store.find_parent_binding(scan.id).await? {
            if let Err(e) = self.tasks.cancel_task(binding.task, false).await {
                log::error!("Failed to cancel parent {}: {}", binding.task, e);
                outcome.errors.push(e.into());
            }
        }
        Ok(())
    }
}
