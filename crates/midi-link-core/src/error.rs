//! Error types for MIDI-Link core.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("MIDI port error: {0}")]
    Midi(#[from] MidiPortError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Discovery service errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to open discovery socket: {0}")]
    Socket(#[from] std::io::Error),

    #[error("Discovery is already running")]
    AlreadyStarted,
}

/// Bridge engine errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Raised by `send` while no TCP session to the console is open.
    #[error("Not connected to {ip}")]
    NotConnected { ip: Ipv4Addr },

    #[error("Bridge is already running")]
    AlreadyStarted,

    #[error("MIDI port error: {0}")]
    Midi(#[from] MidiPortError),
}

/// Virtual MIDI port errors
#[derive(Debug, Error)]
pub enum MidiPortError {
    #[error("Failed to initialise MIDI client: {0}")]
    Init(String),

    #[error("Failed to create virtual port '{name}': {message}")]
    Create { name: String, message: String },

    #[error("Failed to send MIDI message: {0}")]
    Send(String),

    #[error("Virtual MIDI ports are not supported on this platform")]
    Unsupported,
}

/// Settings errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid settings file: {0}")]
    InvalidFile(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        let err = BridgeError::NotConnected {
            ip: Ipv4Addr::new(192, 168, 1, 70),
        };
        assert_eq!(format!("{}", err), "Not connected to 192.168.1.70");
    }

    #[test]
    fn test_core_error_from_bridge_error() {
        let err: CoreError = BridgeError::AlreadyStarted.into();
        assert!(format!("{}", err).contains("Bridge error"));
    }

    #[test]
    fn test_core_error_from_midi_error() {
        let err: CoreError = MidiPortError::Create {
            name: "Allen & Heath Desk".to_string(),
            message: "no sequencer".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Midi(MidiPortError::Create { .. })));
        assert!(format!("{}", err).contains("Allen & Heath Desk"));
    }
}
