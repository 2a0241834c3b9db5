//! CLI argument parsing tests

use clap::Parser;
use scanhub::app::cli::args::{Args, Command};
use std::path::PathBuf;

#[test]
fn test_global_flags_before_command() {
    let args = Args::try_parse_from([
        "scanhub",
        "--config-file",
        "hub.toml",
        "--fixture",
        "scans.json",
        "--log-format",
        "json",
        "--write",
        "cancel",
        "7",
    ])
    .unwrap();

    assert_eq!(args.config_file, Some(PathBuf::from("hub.toml")));
    assert_eq!(args.log_format, "json");
    assert!(args.write);
    assert_eq!(args.command, Command::Cancel { scan: 7 });
}

#[test]
fn test_unknown_log_format_rejected() {
    assert!(Args::try_parse_from([
        "scanhub", "--fixture", "f.json", "--log-format", "xml", "show"
    ])
    .is_err());
}

#[test]
fn test_show_filters() {
    let args = Args::try_parse_from([
        "scanhub", "-x", "f.json", "show", "--release", "rhel-7", "--enabled",
    ])
    .unwrap();
    assert_eq!(
        args.command,
        Command::Show {
            release: Some("rhel-7".to_string()),
            enabled: true
        }
    );
    assert!(!args.command.mutates());
}

#[test]
fn test_finish_needs_task() {
    assert!(Args::try_parse_from(["scanhub", "-x", "f.json", "finish", "3"]).is_err());
}

#[test]
fn test_resubmit_with_base() {
    let args =
        Args::try_parse_from(["scanhub", "-x", "f.json", "resubmit", "3", "--base", "1"]).unwrap();
    assert_eq!(
        args.command,
        Command::Resubmit {
            scan: 3,
            base: Some(1)
        }
    );
}

#[test]
fn test_quiet_lowers_verbosity() {
    let args = Args::try_parse_from(["scanhub", "-x", "f.json", "-qq", "show"]).unwrap();
    assert_eq!(args.verbosity(), -2);
}
