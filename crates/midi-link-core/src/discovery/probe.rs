//! Discovery wire format and probe scheduling.

use std::time::{Duration, Instant};

/// UDP port consoles listen on for discovery probes.
pub const DISCOVERY_PORT: u16 = 51320;

/// Probe datagram broadcast to solicit console replies.
pub const PROBE_PAYLOAD: &[u8; 12] = b"GLD Find\0V2\n";

/// Extract the console name from a discovery reply.
///
/// The payload is the name followed by a single terminator byte. Returns
/// `None` for empty payloads and for our own probe looped back.
pub fn parse_reply(payload: &[u8]) -> Option<String> {
    if payload.is_empty() || payload == PROBE_PAYLOAD {
        return None;
    }

    let name = String::from_utf8_lossy(&payload[..payload.len() - 1]).into_owned();
    Some(name)
}

/// Decides when the next probe is due.
///
/// Only sending a probe resets the schedule; replies have no effect on it.
#[derive(Debug, Clone)]
pub struct ProbeSchedule {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl ProbeSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Whether a probe should go out at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_sent {
            None => true,
            Some(sent) => now.saturating_duration_since(sent) >= self.interval,
        }
    }

    /// Record that a probe was sent at `now`.
    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Time left until the next probe is due.
    pub fn until_due(&self, now: Instant) -> Duration {
        match self.last_sent {
            None => Duration::ZERO,
            Some(sent) => self
                .interval
                .saturating_sub(now.saturating_duration_since(sent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_payload_bytes() {
        assert_eq!(PROBE_PAYLOAD.len(), 12);
        assert_eq!(&PROBE_PAYLOAD[..8], b"GLD Find");
        assert_eq!(PROBE_PAYLOAD[8], 0);
        assert_eq!(&PROBE_PAYLOAD[9..], b"V2\n");
    }

    #[test]
    fn test_parse_reply_strips_terminator() {
        assert_eq!(parse_reply(b"Desk1\0"), Some("Desk1".to_string()));
        assert_eq!(parse_reply(b"GLD-80\n"), Some("GLD-80".to_string()));
    }

    #[test]
    fn test_parse_reply_rejects_empty_and_own_probe() {
        assert_eq!(parse_reply(b""), None);
        assert_eq!(parse_reply(PROBE_PAYLOAD), None);
    }

    #[test]
    fn test_parse_reply_single_byte_is_empty_name() {
        assert_eq!(parse_reply(b"\0"), Some(String::new()));
    }

    #[test]
    fn test_first_probe_is_due_immediately() {
        let schedule = ProbeSchedule::new(Duration::from_secs(10));
        assert!(schedule.is_due(Instant::now()));
    }

    #[test]
    fn test_one_probe_per_interval_regardless_of_replies() {
        let interval = Duration::from_secs(10);
        let poll = Duration::from_millis(500);
        let mut schedule = ProbeSchedule::new(interval);
        let start = Instant::now();

        // Walk 30s of loop iterations; every iteration also "receives" a
        // burst of replies, which must not influence the schedule.
        let mut probes = Vec::new();
        let mut t = Duration::ZERO;
        while t < Duration::from_secs(30) {
            let now = start + t;
            if schedule.is_due(now) {
                schedule.mark_sent(now);
                probes.push(t);
            }
            t += poll;
        }

        assert_eq!(
            probes,
            vec![
                Duration::ZERO,
                Duration::from_secs(10),
                Duration::from_secs(20)
            ]
        );
    }

    #[test]
    fn test_until_due_counts_down() {
        let mut schedule = ProbeSchedule::new(Duration::from_secs(10));
        let start = Instant::now();
        schedule.mark_sent(start);

        assert_eq!(
            schedule.until_due(start + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            schedule.until_due(start + Duration::from_secs(12)),
            Duration::ZERO
        );
        assert!(!schedule.is_due(start + Duration::from_millis(9_999)));
    }
}
