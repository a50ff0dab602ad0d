//! Error types for the MIDI-Link CLI.
//!
//! CliError wraps CoreError from the shared library and adds CLI-specific variants.

use std::net::Ipv4Addr;

use midi_link_core::error::CoreError;
use thiserror::Error;

pub use midi_link_core::error::{BridgeError, ConfigError, DiscoveryError, MidiPortError};

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NETWORK_ERROR: i32 = 2;
    pub const DEVICE_ERROR: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("No consoles found")]
    NoDevicesFound,

    #[error("Several consoles found ({}); choose one with --address", format_addresses(.0))]
    AmbiguousDevice(Vec<Ipv4Addr>),
}

fn format_addresses(addresses: &[Ipv4Addr]) -> String {
    addresses
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => match e {
                CoreError::Discovery(DiscoveryError::AlreadyStarted)
                | CoreError::Bridge(BridgeError::AlreadyStarted) => exit_codes::GENERAL_ERROR,
                CoreError::Discovery(_) => exit_codes::NETWORK_ERROR,
                CoreError::Bridge(BridgeError::Midi(_)) => exit_codes::DEVICE_ERROR,
                CoreError::Bridge(_) => exit_codes::NETWORK_ERROR,
                CoreError::Midi(_) => exit_codes::DEVICE_ERROR,
                CoreError::Config(_) => exit_codes::INVALID_ARGS,
            },
            CliError::NoDevicesFound => exit_codes::DEVICE_ERROR,
            CliError::AmbiguousDevice(_) => exit_codes::INVALID_ARGS,
        }
    }
}

// Conversions from core error subtypes to CliError
impl From<DiscoveryError> for CliError {
    fn from(e: DiscoveryError) -> Self {
        CliError::Core(CoreError::Discovery(e))
    }
}

impl From<BridgeError> for CliError {
    fn from(e: BridgeError) -> Self {
        CliError::Core(CoreError::Bridge(e))
    }
}

impl From<MidiPortError> for CliError {
    fn from(e: MidiPortError) -> Self {
        CliError::Core(CoreError::Midi(e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Core(CoreError::Config(e))
    }
}
