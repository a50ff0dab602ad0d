//! UDP console discovery.
//!
//! Broadcasts a probe, collects the name replies, and keeps a registry of
//! live consoles with time-based eviction.

pub mod probe;
pub mod registry;
pub mod service;

pub use probe::{parse_reply, ProbeSchedule, DISCOVERY_PORT, PROBE_PAYLOAD};
pub use registry::{DeviceLookup, DeviceRecord, DeviceRegistry, Observation, Registry};
pub use service::{Discovery, DiscoveryConfig};
