//! Scan filtering
//!
//! One filter value shared by every storage backend. Backends implement
//! [`ScanQuery`](crate::scan::ports::ScanQuery) by translating it; the
//! in-memory store uses [`ScanFilter::matches`] directly.

use crate::scan::types::ScanRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    release: Option<String>,
    package: Option<String>,
    target_only: bool,
    enabled_only: bool,
    finished_well: bool,
}

impl ScanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_release(mut self, tag: impl Into<String>) -> Self {
        self.release = Some(tag.into());
        self
    }

    pub fn by_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn target_only(mut self) -> Self {
        self.target_only = true;
        self
    }

    pub fn enabled_only(mut self) -> Self {
        self.enabled_only = true;
        self
    }

    pub fn finished_well(mut self) -> Self {
        self.finished_well = true;
        self
    }

    pub fn matches(&self, scan: &ScanRecord) -> bool {
        if let Some(release) = &self.release {
            if scan.release.as_deref() != Some(release.as_str()) {
                return false;
            }
        }
        if let Some(package) = &self.package {
            if &scan.package != package {
                return false;
            }
        }
        if self.target_only && !scan.is_target() {
            return false;
        }
        if self.enabled_only && !scan.enabled {
            return false;
        }
        if self.finished_well && !scan.state.is_finished_well() {
            return false;
        }
        true
    }
}

/// Newest submitted scan among `scans`
pub fn latest(scans: Vec<ScanRecord>) -> Option<ScanRecord> {
    scans
        .into_iter()
        .max_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)))
}
