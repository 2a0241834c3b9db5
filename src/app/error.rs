//! CLI errors

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::core::error_handling::ContextualError;
use crate::scan::api::{LifecycleError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Cannot load fixture: {0}")]
    Store(#[from] StoreError),

    #[error("Fixture {path}: {message}")]
    Fixture { path: PathBuf, message: String },

    #[error("Command needs a scan id")]
    MissingScan,

    #[error("Command needs a task id")]
    MissingTask,
}

impl ContextualError for AppError {
    fn is_user_actionable(&self) -> bool {
        match self {
            AppError::Config(e) => e.is_user_actionable(),
            AppError::Lifecycle(e) => e.is_user_actionable(),
            AppError::Store(_) => false,
            AppError::Fixture { .. } | AppError::MissingScan | AppError::MissingTask => true,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Lifecycle(e) => e.user_message(),
            AppError::Fixture { message, .. } => Some(message),
            AppError::MissingScan => Some("Command needs a scan id"),
            AppError::MissingTask => Some("Command needs a task id"),
            AppError::Store(_) => None,
        }
    }
}
