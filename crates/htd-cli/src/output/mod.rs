//! Output formatting for the CLI
//!
//! Machine tables, the session summary and colored one-line messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use htd_core::time::format_countdown;
use htd_core::Machine;

/// Format the machine list as a table
///
/// The short form shows id, name and platform; `detailed` adds the
/// address and hostname columns. Rows keep the registry's order.
pub fn format_machines(machines: &[Machine], detailed: bool) -> String {
    if machines.is_empty() {
        return "No machines available".to_string();
    }

    #[derive(Tabled)]
    struct MachineRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "OS")]
        os: String,
    }

    #[derive(Tabled)]
    struct MachineRowDetailed {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "HOSTNAME")]
        hostname: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "OS")]
        os: String,
    }

    if detailed {
        let rows: Vec<MachineRowDetailed> = machines
            .iter()
            .map(|m| MachineRowDetailed {
                id: m.id.to_string(),
                name: m.name.clone(),
                hostname: m.hostname.clone().unwrap_or_else(|| "-".to_string()),
                address: or_dash(&m.address),
                os: or_dash(&m.platform),
            })
            .collect();

        Table::new(rows)
            .with(Style::rounded())
            .with(Width::wrap(120))
            .to_string()
    } else {
        let rows: Vec<MachineRow> = machines
            .iter()
            .map(|m| MachineRow {
                id: truncate(m.id.as_str(), 12),
                name: m.name.clone(),
                os: or_dash(&m.platform),
            })
            .collect();

        Table::new(rows).with(Style::rounded()).to_string()
    }
}

/// `[MM:SS]` as shown next to the session status
pub fn bracketed_countdown(remaining: i64) -> String {
    format!("[{}]", format_countdown(remaining))
}

fn or_dash(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
