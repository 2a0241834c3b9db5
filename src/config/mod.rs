//! Hub settings
//!
//! Settings the lifecycle consults at run time, loaded from a TOML file and
//! injected as the [`ConfigPort`]. Example:
//!
//! ```toml
//! [notifications]
//! send_bus_message = true
//!
//! [waivers]
//! overdue_days = 7
//!
//! [waivers.overdue_days_by_release]
//! rhel-7 = 14
//!
//! [scanner]
//! name = "coverity"
//! version = "6.5.0"
//!
//! [scanning]
//! default_command = "cov-mockbuild {mock_profile} {srpm_path} {tmp_dir}"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::scan::ports::ConfigPort;

/// Longest accepted overdue window, about a century
pub const MAX_OVERDUE_DAYS: u32 = 36_500;

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing setting: {key}")]
    Missing { key: String },

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Cannot read configuration file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Cannot parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true // Every settings problem is fixed by editing the file
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Invalid { message, .. } => Some(message),
            ConfigError::Read { message, .. } => Some(message),
            ConfigError::Parse { message, .. } => Some(message),
            ConfigError::Missing { key } => Some(key),
        }
    }
}

/// Analyser name and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerVersion {
    pub name: String,
    pub version: String,
}

impl ScannerVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Post a bus message whenever a scan changes state
    pub send_bus_message: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaiverSettings {
    /// Days a finished scan may stay unprocessed
    pub overdue_days: Option<u32>,
    pub overdue_days_by_release: HashMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningSettings {
    pub default_command: Option<String>,
    pub command_by_release: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub notifications: NotificationSettings,
    pub waivers: WaiverSettings,
    pub scanner: Option<ScannerVersion>,
    pub scanning: ScanningSettings,
}

impl HubSettings {
    /// Default settings file: `<config dir>/Scanhub/scanhub.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Scanhub").join("scanhub.toml"))
    }

    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let settings: HubSettings =
            toml::from_str(contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading hub settings from {}", path.display());
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_toml_str(&contents, path)
    }

    /// Load from an explicit file, else the default file if present, else defaults
    ///
    /// An explicitly requested file must exist.
    pub async fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path).await,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path).await,
                _ => {
                    log::debug!("No settings file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(days) = self.waivers.overdue_days {
            check_window("waivers.overdue_days".to_string(), days)?;
        }
        for (tag, days) in &self.waivers.overdue_days_by_release {
            if tag.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "waivers.overdue_days_by_release".to_string(),
                    message: "release tag cannot be empty".to_string(),
                });
            }
            check_window(format!("waivers.overdue_days_by_release.{tag}"), *days)?;
        }
        Ok(())
    }
}

fn check_window(key: String, days: u32) -> Result<(), ConfigError> {
    if days == 0 || days > MAX_OVERDUE_DAYS {
        return Err(ConfigError::Invalid {
            message: format!("{key} must be between 1 and {MAX_OVERDUE_DAYS} days, got {days}"),
            key,
        });
    }
    Ok(())
}

impl ConfigPort for HubSettings {
    fn default_overdue_window(&self) -> Result<TimeDelta, ConfigError> {
        self.waivers
            .overdue_days
            .map(|days| TimeDelta::days(i64::from(days)))
            .ok_or_else(|| ConfigError::Missing {
                key: "waivers.overdue_days".to_string(),
            })
    }

    fn overdue_window_for_release(&self, tag: &str) -> Result<Option<TimeDelta>, ConfigError> {
        Ok(self
            .waivers
            .overdue_days_by_release
            .get(tag)
            .map(|days| TimeDelta::days(i64::from(*days))))
    }

    fn send_notifications_enabled(&self) -> bool {
        self.notifications.send_bus_message
    }

    fn actual_scanner(&self) -> Result<ScannerVersion, ConfigError> {
        self.scanner.clone().ok_or_else(|| ConfigError::Missing {
            key: "scanner".to_string(),
        })
    }

    fn scanning_command(&self, tag: &str) -> Result<String, ConfigError> {
        if let Some(command) = self.scanning.command_by_release.get(tag) {
            return Ok(command.clone());
        }
        self.scanning
            .default_command
            .clone()
            .ok_or_else(|| ConfigError::Missing {
                key: "scanning.default_command".to_string(),
            })
    }
}
