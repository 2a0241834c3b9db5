//! Table output for scans

use prettytable::{format, Cell, Row, Table};

use crate::core::styles::StyleRole;
use crate::scan::types::{ScanRecord, WaiverTimeliness};

const HEADERS: [&str; 8] = [
    "ID", "NVR", "Type", "State", "Enabled", "Base", "Parent", "Task",
];

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn styled(text: String, role: StyleRole, color: bool) -> Cell {
    let cell = Cell::new(&text);
    match role.table_spec() {
        Some(spec) if color => cell.style_spec(&spec),
        _ => cell,
    }
}

/// Build the scan table
pub fn scan_table(scans: &[ScanRecord], color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(Row::new(
        HEADERS
            .iter()
            .map(|h| styled(h.to_string(), StyleRole::Header, color))
            .collect(),
    ));

    for scan in scans {
        let state_role = StyleRole::for_state(scan.state);
        table.add_row(Row::new(vec![
            Cell::new(&scan.id.to_string()),
            Cell::new(&scan.nvr),
            Cell::new(&scan.scan_type.to_string()),
            styled(scan.state.to_string(), state_role, color),
            styled(
                if scan.enabled { "yes" } else { "no" }.to_string(),
                if scan.enabled { StyleRole::Value } else { StyleRole::Dim },
                color,
            ),
            Cell::new(&optional(scan.base)),
            Cell::new(&optional(scan.parent)),
            Cell::new(&optional(scan.task)),
        ]));
    }
    table
}

/// Print scans, with the failure reason under failed ones
pub fn print_scans(scans: &[ScanRecord], color: bool) {
    if scans.is_empty() {
        eprintln!("No scans.");
        return;
    }
    scan_table(scans, color).printstd();
    for scan in scans {
        if let Some(reason) = &scan.failure_reason {
            println!(
                "{} {}",
                scan.id,
                StyleRole::Bad.paint(reason, color)
            );
        }
    }
}

pub fn timeliness_label(timeliness: WaiverTimeliness, color: bool) -> String {
    let role = match timeliness {
        WaiverTimeliness::OnTime => StyleRole::Good,
        WaiverTimeliness::Overdue => StyleRole::Bad,
        WaiverTimeliness::NotApplicable => StyleRole::Dim,
    };
    role.paint(&timeliness.to_string(), color)
}
