//! Command line arguments

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::core::styles::clap_styles;

use crate::scan::types::{ScanId, TaskId};

#[derive(Parser, Debug, Clone)]
#[command(name = "scanhub")]
#[command(about = "Drive scan lifecycle events against a JSON fixture")]
#[command(version, long_version = crate::core::version::long_version())]
pub struct Args {
    /// Hub settings file (default: <config dir>/Scanhub/scanhub.toml)
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Scans, tasks and analysis results to operate on
    #[arg(short = 'x', long = "fixture", value_name = "FILE")]
    pub fixture: PathBuf,

    /// Write the resulting state back to the fixture
    #[arg(short = 'w', long = "write")]
    pub write: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"], default_value = "text")]
    pub log_format: String,

    /// Log file path
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// More output (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less output (repeatable)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Force coloured output
    #[arg(long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List scans
    Show {
        /// Only scans of this release
        #[arg(long)]
        release: Option<String>,
        /// Only enabled scans
        #[arg(long)]
        enabled: bool,
    },
    /// Scan was handed to the scheduler
    Queue { scan: u64 },
    /// Worker started the analysis
    Start { scan: u64 },
    /// Task ended; process results
    Finish { scan: u64, task: u64 },
    /// Task failed or was canceled
    Fail { scan: u64, task: u64 },
    /// Cancel a scan
    Cancel { scan: u64 },
    /// A waiver was submitted
    Waive { scan: u64 },
    /// A waiver was invalidated
    Invalidate { scan: u64 },
    /// Check the waiver deadline
    Overdue { scan: u64 },
    /// Submit a fresh copy of a scan
    Resubmit {
        scan: u64,
        /// Base scan for the copy
        #[arg(long)]
        base: Option<u64>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Show { .. } => "show",
            Command::Queue { .. } => "queue",
            Command::Start { .. } => "start",
            Command::Finish { .. } => "finish",
            Command::Fail { .. } => "fail",
            Command::Cancel { .. } => "cancel",
            Command::Waive { .. } => "waive",
            Command::Invalidate { .. } => "invalidate",
            Command::Overdue { .. } => "overdue",
            Command::Resubmit { .. } => "resubmit",
        }
    }

    /// Scan the command targets
    pub fn scan_id(&self) -> Option<ScanId> {
        match self {
            Command::Show { .. } => None,
            Command::Queue { scan }
            | Command::Start { scan }
            | Command::Finish { scan, .. }
            | Command::Fail { scan, .. }
            | Command::Cancel { scan }
            | Command::Waive { scan }
            | Command::Invalidate { scan }
            | Command::Overdue { scan }
            | Command::Resubmit { scan, .. } => Some(ScanId(*scan)),
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Command::Finish { task, .. } | Command::Fail { task, .. } => Some(TaskId(*task)),
            _ => None,
        }
    }

    /// Whether the command can change stored state
    pub fn mutates(&self) -> bool {
        !matches!(self, Command::Show { .. } | Command::Overdue { .. })
    }
}

impl Args {
    /// -v/-q balance
    pub fn verbosity(&self) -> i8 {
        (self.verbose.min(3) as i8) - (self.quiet.min(3) as i8)
    }

    pub fn use_color(&self) -> bool {
        resolve_color(self.color, self.no_color)
    }

    /// Parse the process arguments, styling help and errors per the colour flags
    pub fn parse_styled() -> Self {
        let raw: Vec<OsString> = std::env::args_os().collect();
        let matches = Self::styled_command(help_colors(&raw)).get_matches_from(raw);
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn styled_command(colors: bool) -> clap::Command {
        Self::command().styles(clap_styles(colors))
    }
}

fn resolve_color(color: bool, no_color: bool) -> bool {
    if no_color {
        false
    } else {
        color || std::io::IsTerminal::is_terminal(&std::io::stdout())
    }
}

/// Colour flags as seen before clap has parsed anything
pub fn help_colors(raw: &[OsString]) -> bool {
    let has = |flag: &str| raw.iter().any(|arg| arg.as_os_str() == flag);
    resolve_color(has("--color"), has("--no-color"))
}
