//! Waiver deadline computation

use chrono::{DateTime, TimeDelta, Utc};

use crate::scan::error::{LifecycleError, LifecycleResult};
use crate::scan::ports::ConfigPort;
use crate::scan::types::{ScanRecord, WaiverTimeliness};

/// Window a scan of `release` has to be processed in
///
/// A release without an override uses the global default. Lookup failures
/// are configuration errors, never a zero window.
pub fn overdue_window(config: &dyn ConfigPort, release: Option<&str>) -> LifecycleResult<TimeDelta> {
    if let Some(tag) = release {
        if let Some(window) = config.overdue_window_for_release(tag)? {
            return Ok(window);
        }
        log::trace!("No overdue override for {}, using default", tag);
    }
    Ok(config.default_overdue_window()?)
}

/// Whether `scan` was (or still can be) processed in time
pub fn waived_on_time(
    scan: &ScanRecord,
    now: DateTime<Utc>,
    config: &dyn ConfigPort,
) -> LifecycleResult<WaiverTimeliness> {
    if scan.state.is_finished_bad() {
        return Ok(WaiverTimeliness::NotApplicable);
    }
    if scan.state.is_processed() {
        return Ok(WaiverTimeliness::OnTime);
    }

    let window = overdue_window(config, scan.release.as_deref())?;
    let deadline = scan
        .last_access
        .checked_add_signed(window)
        .ok_or_else(|| LifecycleError::Configuration {
            message: format!(
                "overdue window of {} days puts the deadline of {} out of range",
                window.num_days(),
                scan.id
            ),
        })?;
    if now <= deadline {
        Ok(WaiverTimeliness::OnTime)
    } else {
        Ok(WaiverTimeliness::Overdue)
    }
}
