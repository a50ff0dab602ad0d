//! Shared data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Snapshot of a console currently known to discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDevice {
    /// Source address of the discovery reply.
    pub ip: Ipv4Addr,
    /// Name the console reported, terminator stripped.
    pub name: String,
    /// Milliseconds since the last reply.
    pub age_ms: u64,
    /// Wall-clock time of the last reply.
    pub last_seen: DateTime<Utc>,
}
