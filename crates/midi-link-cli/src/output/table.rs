//! Table-formatted output for CLI.

use std::net::Ipv4Addr;

use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use super::OutputFormatter;
use midi_link_core::types::DiscoveredDevice;
use midi_link_core::ConnectionState;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }

    fn age_cell(age_ms: u64) -> Cell {
        let cell = Cell::new(format!("{:.1}s", age_ms as f64 / 1000.0));
        // Consoles answer every probe; more than one missed round is worth flagging.
        if age_ms > 10_000 {
            cell.fg(Color::Yellow)
        } else {
            cell.fg(Color::Green)
        }
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_devices(&self, devices: &[DiscoveredDevice]) -> String {
        if devices.is_empty() {
            return "No consoles found.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["IP", "Name", "Last Seen"]);

        for device in devices {
            table.add_row(vec![
                Cell::new(device.ip),
                Cell::new(&device.name),
                Self::age_cell(device.age_ms),
            ]);
        }

        format!("{}\n\nFound {} console(s)", table, devices.len())
    }

    fn format_bridge_state(&self, peer: Ipv4Addr, state: ConnectionState) -> String {
        let label = match state {
            ConnectionState::Connected => "connected".green(),
            ConnectionState::Connecting => "connecting".yellow(),
            ConnectionState::Disconnected => "disconnected".red(),
        };
        format!("{} {}", peer.to_string().bold(), label)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}", "Error:".red().bold(), error)
    }
}
