//! Event types for the notification system

use std::time::SystemTime;

use serde::Serialize;

use crate::scan::types::{NoticeClass, ScanId, ScanRecord, ScanState};

/// Announcement that a scan entered a new state
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateNotice {
    /// Name of the new state, e.g. `NEEDS_INSPECTION`
    pub state: ScanState,
    pub class: NoticeClass,
    pub scan_id: ScanId,
    pub nvr: String,
    pub package: String,
    pub release: Option<String>,
    #[serde(skip)]
    pub timestamp: SystemTime,
}

impl StateNotice {
    pub fn new(scan: &ScanRecord, class: NoticeClass) -> Self {
        Self {
            state: scan.state,
            class,
            scan_id: scan.id,
            nvr: scan.nvr.clone(),
            package: scan.package.clone(),
            release: scan.release.clone(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn state_name(&self) -> String {
        self.state.to_string()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SystemEventType {
    Startup,
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct SystemEvent {
    pub event_type: SystemEventType,
    pub timestamp: SystemTime,
    pub message: Option<String>,
}

impl SystemEvent {
    pub fn new(event_type: SystemEventType) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: None,
        }
    }

    pub fn with_message(event_type: SystemEventType, message: String) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            message: Some(message),
        }
    }
}

/// Unified event enum that encompasses all event types
#[derive(Clone, Debug)]
pub enum Event {
    State(StateNotice),
    System(SystemEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::State(_) => "State",
            Event::System(_) => "System",
        }
    }
}

/// Event filtering options for subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum EventFilter {
    StateOnly,
    /// State notices classified "finished"
    FinishedOnly,
    SystemOnly,
    All,
}

impl EventFilter {
    /// Check if this filter accepts the given event
    pub fn accepts(&self, event: &Event) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::StateOnly, Event::State(_)) => true,
            (EventFilter::FinishedOnly, Event::State(notice)) => {
                notice.class == NoticeClass::Finished
            }
            (EventFilter::SystemOnly, Event::System(_)) => true,
            _ => false,
        }
    }
}
