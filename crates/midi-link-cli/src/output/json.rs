//! JSON-formatted output for CLI.

use std::net::Ipv4Addr;

use serde::Serialize;
use serde_json::json;

use super::OutputFormatter;
use midi_link_core::types::DiscoveredDevice;
use midi_link_core::ConnectionState;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_devices(&self, devices: &[DiscoveredDevice]) -> String {
        Self::to_json(&json!({
            "devices": devices,
            "count": devices.len()
        }))
    }

    fn format_bridge_state(&self, peer: Ipv4Addr, state: ConnectionState) -> String {
        // One line per event so the stream can be consumed as NDJSON.
        serde_json::to_string(&json!({
            "peer": peer,
            "state": state,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_message(&self, message: &str) -> String {
        Self::to_json(&json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        Self::to_json(&json!({ "error": error }))
    }
}
