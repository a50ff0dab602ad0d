//! Output formatting for CLI results.

pub mod json;
pub mod table;

use std::net::Ipv4Addr;

pub use json::JsonOutput;
pub use table::TableOutput;

use midi_link_core::types::DiscoveredDevice;
use midi_link_core::ConnectionState;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format the discovered console list
    fn format_devices(&self, devices: &[DiscoveredDevice]) -> String;

    /// Format a bridge connection state change
    fn format_bridge_state(&self, peer: Ipv4Addr, state: ConnectionState) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;

    /// Format an error
    fn format_error(&self, error: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
