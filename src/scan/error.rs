//! Lifecycle Error Types

use crate::config::ConfigError;
use crate::notifications::api::NotificationError;
use crate::scan::ports::{ResultsError, StoreError, TaskError};
use crate::scan::types::{ScanId, ScanState};

/// Errors surfaced by lifecycle entry points
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Scan not found: {scan_id}")]
    NotFound { scan_id: ScanId },

    #[error("Invalid transition for scan {scan_id}: {event} is not allowed in state {state}")]
    InvalidTransition {
        scan_id: ScanId,
        state: ScanState,
        event: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{port} port failed: {message}")]
    PortFailure { port: &'static str, message: String },

    #[error("Cycle detected in scan chain at {scan_id}")]
    CycleDetected { scan_id: ScanId },

    #[error("Invalid scan record: {message}")]
    InvalidRecord { message: String },
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Missing { scan_id } => LifecycleError::NotFound { scan_id },
            other => LifecycleError::PortFailure {
                port: "persistence",
                message: other.to_string(),
            },
        }
    }
}

impl From<TaskError> for LifecycleError {
    fn from(error: TaskError) -> Self {
        LifecycleError::PortFailure {
            port: "task",
            message: error.to_string(),
        }
    }
}

impl From<NotificationError> for LifecycleError {
    fn from(error: NotificationError) -> Self {
        LifecycleError::PortFailure {
            port: "notification",
            message: error.to_string(),
        }
    }
}

impl From<ResultsError> for LifecycleError {
    fn from(error: ResultsError) -> Self {
        LifecycleError::PortFailure {
            port: "results",
            message: error.to_string(),
        }
    }
}

impl From<ConfigError> for LifecycleError {
    fn from(error: ConfigError) -> Self {
        LifecycleError::Configuration {
            message: error.to_string(),
        }
    }
}

impl crate::core::error_handling::ContextualError for LifecycleError {
    fn is_user_actionable(&self) -> bool {
        match self {
            LifecycleError::NotFound { .. } => true,
            LifecycleError::InvalidTransition { .. } => true,
            LifecycleError::Configuration { .. } => true,
            LifecycleError::InvalidRecord { .. } => true,
            LifecycleError::PortFailure { .. } => false, // Collaborator outage
            LifecycleError::CycleDetected { .. } => false, // Corrupt data
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            LifecycleError::Configuration { message } => Some(message),
            LifecycleError::InvalidRecord { message } => Some(message),
            LifecycleError::NotFound { .. } => Some("Unknown scan id"),
            LifecycleError::InvalidTransition { .. } => {
                Some("Requested event is not valid for the scan's current state")
            }
            _ => None,
        }
    }
}
