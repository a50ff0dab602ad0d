//! Liveness-tracked registry of discovered consoles.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::types::DiscoveredDevice;

/// Read-only view of discovery used by the bridge.
pub trait DeviceLookup: Send + Sync {
    /// Name reported by the console at `ip`, if it is currently live.
    fn name_for_address(&self, ip: Ipv4Addr) -> Option<String>;

    /// Whether the console at `ip` has replied within the eviction timeout.
    fn is_live(&self, ip: Ipv4Addr) -> bool {
        self.name_for_address(ip).is_some()
    }
}

/// One console, keyed by its address.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub address: Ipv4Addr,
    pub name: String,
    last_seen: Instant,
    last_seen_wall: DateTime<Utc>,
}

impl DeviceRecord {
    /// Time since the console last replied.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    fn to_device(&self, now: Instant) -> DiscoveredDevice {
        DiscoveredDevice {
            ip: self.address,
            name: self.name.clone(),
            age_ms: self.age(now).as_millis() as u64,
            last_seen: self.last_seen_wall,
        }
    }
}

/// Outcome of recording a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First reply from this address.
    New,
    /// Known address reporting a different name.
    Renamed,
    /// Known address, same name; only the age was reset.
    Refreshed,
}

/// Address-keyed records with time-based eviction.
///
/// Not synchronised; see [`DeviceRegistry`] for the shared handle.
#[derive(Debug)]
pub struct Registry {
    timeout: Duration,
    records: HashMap<Ipv4Addr, DeviceRecord>,
}

impl Registry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            records: HashMap::new(),
        }
    }

    /// Insert or refresh the record for `address`, resetting its age.
    pub fn observe(&mut self, address: Ipv4Addr, name: &str, now: Instant) -> Observation {
        let wall = Utc::now();
        match self.records.get_mut(&address) {
            Some(record) => {
                record.last_seen = now;
                record.last_seen_wall = wall;
                if record.name != name {
                    record.name = name.to_string();
                    Observation::Renamed
                } else {
                    Observation::Refreshed
                }
            }
            None => {
                self.records.insert(
                    address,
                    DeviceRecord {
                        address,
                        name: name.to_string(),
                        last_seen: now,
                        last_seen_wall: wall,
                    },
                );
                Observation::New
            }
        }
    }

    /// Remove every record whose age has reached the timeout.
    ///
    /// Returns the evicted addresses.
    pub fn evict_stale(&mut self, now: Instant) -> Vec<Ipv4Addr> {
        let timeout = self.timeout;
        let mut evicted = Vec::new();
        self.records.retain(|address, record| {
            let live = record.age(now) < timeout;
            if !live {
                evicted.push(*address);
            }
            live
        });
        evicted
    }

    /// Live record for `address`. Stale records are hidden even before eviction.
    pub fn get(&self, address: Ipv4Addr, now: Instant) -> Option<&DeviceRecord> {
        self.records
            .get(&address)
            .filter(|record| record.age(now) < self.timeout)
    }

    pub fn name_for(&self, address: Ipv4Addr, now: Instant) -> Option<String> {
        self.get(address, now).map(|record| record.name.clone())
    }

    /// Live devices sorted by address.
    pub fn snapshot(&self, now: Instant) -> Vec<DiscoveredDevice> {
        let mut devices: Vec<DiscoveredDevice> = self
            .records
            .values()
            .filter(|record| record.age(now) < self.timeout)
            .map(|record| record.to_device(now))
            .collect();
        devices.sort_by_key(|device| device.ip);
        devices
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Shared, lock-protected registry handle.
///
/// Every read, insert, refresh and the scan-and-evict pass run under the same
/// lock.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl DeviceRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::new(timeout))),
        }
    }

    pub fn observe(&self, address: Ipv4Addr, name: &str) -> Observation {
        self.inner.lock().observe(address, name, Instant::now())
    }

    pub fn evict_stale(&self) -> Vec<Ipv4Addr> {
        self.inner.lock().evict_stale(Instant::now())
    }

    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        self.inner.lock().snapshot(Instant::now())
    }
}

impl DeviceLookup for DeviceRegistry {
    fn name_for_address(&self, ip: Ipv4Addr) -> Option<String> {
        self.inner.lock().name_for(ip, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(15);

    fn desk() -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, 70)
    }

    #[test]
    fn test_observe_new_then_refresh() {
        let mut registry = Registry::new(TIMEOUT);
        let t0 = Instant::now();

        assert_eq!(registry.observe(desk(), "Desk1", t0), Observation::New);
        assert_eq!(
            registry.observe(desk(), "Desk1", t0 + Duration::from_secs(1)),
            Observation::Refreshed
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_observe_rename() {
        let mut registry = Registry::new(TIMEOUT);
        let t0 = Instant::now();

        registry.observe(desk(), "Desk1", t0);
        assert_eq!(registry.observe(desk(), "FOH", t0), Observation::Renamed);
        assert_eq!(registry.name_for(desk(), t0), Some("FOH".to_string()));
    }

    #[test]
    fn test_name_survives_while_replies_keep_arriving() {
        let mut registry = Registry::new(TIMEOUT);
        let t0 = Instant::now();

        // A reply every 10s keeps the record alive for a minute.
        for step in 0..6u64 {
            let now = t0 + Duration::from_secs(step * 10);
            registry.observe(desk(), "Desk1", now);
            registry.evict_stale(now + Duration::from_secs(9));
            assert_eq!(
                registry.name_for(desk(), now + Duration::from_secs(9)),
                Some("Desk1".to_string())
            );
        }
    }

    #[test]
    fn test_name_gone_after_timeout() {
        let mut registry = Registry::new(TIMEOUT);
        let t0 = Instant::now();
        registry.observe(desk(), "Desk1", t0);

        let late = t0 + TIMEOUT;
        // Hidden before the eviction pass runs...
        assert_eq!(registry.name_for(desk(), late), None);
        // ...and removed once it does.
        assert_eq!(registry.evict_stale(late), vec![desk()]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict_keeps_fresh_records() {
        let mut registry = Registry::new(TIMEOUT);
        let t0 = Instant::now();
        let other = Ipv4Addr::new(192, 168, 1, 71);

        registry.observe(desk(), "stale", t0);
        registry.observe(other, "fresh", t0 + Duration::from_secs(10));

        let evicted = registry.evict_stale(t0 + Duration::from_secs(16));
        assert_eq!(evicted, vec![desk()]);
        assert_eq!(
            registry.name_for(other, t0 + Duration::from_secs(16)),
            Some("fresh".to_string())
        );
    }

    #[test]
    fn test_snapshot_sorted_and_live_only() {
        let mut registry = Registry::new(TIMEOUT);
        let t0 = Instant::now();

        registry.observe(Ipv4Addr::new(10, 0, 0, 9), "B", t0 + Duration::from_secs(5));
        registry.observe(Ipv4Addr::new(10, 0, 0, 2), "A", t0 + Duration::from_secs(5));
        registry.observe(Ipv4Addr::new(10, 0, 0, 5), "old", t0);

        let devices = registry.snapshot(t0 + Duration::from_secs(15));
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(devices[0].age_ms, 10_000);
    }

    #[test]
    fn test_shared_registry_lookup() {
        let registry = DeviceRegistry::new(TIMEOUT);
        assert!(!registry.is_live(desk()));

        registry.observe(desk(), "Desk1");
        assert!(registry.is_live(desk()));
        assert_eq!(registry.name_for_address(desk()), Some("Desk1".to_string()));

        let clone = registry.clone();
        assert_eq!(clone.devices().len(), 1);
    }
}
