//! Settings file.
//!
//! A JSON document with two sections. Every field has a default, so an empty
//! object (or a missing file) yields the stock protocol timings. Durations are
//! stored in milliseconds and converted to the runtime configs on demand.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::{BridgeConfig, PortNaming};
use crate::discovery::{DiscoveryConfig, DISCOVERY_PORT};
use crate::error::ConfigError;
use crate::midi::{BASE_PORT_NAME, CLIENT_NAME};
use crate::protocol::CONSOLE_PORT;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub discovery: DiscoverySettings,
    pub bridge: BridgeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoverySettings {
    pub broadcast_address: Ipv4Addr,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub retransmit_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            broadcast_address: Ipv4Addr::BROADCAST,
            port: DISCOVERY_PORT,
            poll_interval_ms: 500,
            retransmit_interval_ms: 10_000,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeSettings {
    pub port: u16,
    pub poll_interval_ms: u64,
    pub idle_timeout_ms: u64,
    /// Generic virtual port name.
    pub port_name: String,
    /// MIDI client the virtual ports are registered under.
    pub client_name: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            port: CONSOLE_PORT,
            poll_interval_ms: 500,
            idle_timeout_ms: 5_000,
            port_name: BASE_PORT_NAME.to_string(),
            client_name: CLIENT_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Platform settings location, e.g. `~/.config/midi-link/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "midi-link")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Read and validate a settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {}", path.display(), e))
        })?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.discovery;
        if d.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "discovery.pollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if d.retransmit_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "discovery.retransmitIntervalMs must be greater than zero".to_string(),
            ));
        }
        if d.timeout_ms <= d.retransmit_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "discovery.timeoutMs ({}) must exceed discovery.retransmitIntervalMs ({})",
                d.timeout_ms, d.retransmit_interval_ms
            )));
        }

        let b = &self.bridge;
        if b.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "bridge.pollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if b.port_name.trim().is_empty() {
            return Err(ConfigError::Invalid("bridge.portName must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn to_discovery_config(&self) -> DiscoveryConfig {
        let d = &self.discovery;
        DiscoveryConfig {
            target: SocketAddr::V4(SocketAddrV4::new(d.broadcast_address, d.port)),
            poll_interval: Duration::from_millis(d.poll_interval_ms),
            retransmit_interval: Duration::from_millis(d.retransmit_interval_ms),
            timeout: Duration::from_millis(d.timeout_ms),
        }
    }

    pub fn to_bridge_config(&self, peer: Ipv4Addr, naming: PortNaming) -> BridgeConfig {
        let b = &self.bridge;
        BridgeConfig {
            peer,
            port: b.port,
            poll_interval: Duration::from_millis(b.poll_interval_ms),
            idle_timeout: Duration::from_millis(b.idle_timeout_ms),
            naming,
            port_name: b.port_name.clone(),
        }
    }
}
