//! Complete MIDI messages and status byte classification.

use std::fmt;

use midly::live::LiveEvent;

/// How a status byte frames the bytes that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// 0x80-0xEF: channel voice/mode, eligible for running status.
    Channel { data_len: usize },
    /// 0xF0: opens a SysEx message.
    SysExStart,
    /// 0xF7: closes a SysEx message (EOX).
    SysExEnd,
    /// Fixed-length system common message; clears running status.
    SystemCommon { data_len: usize },
    /// 0xF8-0xFF: single byte, may appear anywhere.
    RealTime,
    /// 0xF4, 0xF5: undefined system common.
    Undefined,
}

impl StatusKind {
    /// Classify a status byte (>= 0x80).
    pub fn of(status: u8) -> StatusKind {
        match status {
            0x80..=0xBF | 0xE0..=0xEF => StatusKind::Channel { data_len: 2 },
            0xC0..=0xDF => StatusKind::Channel { data_len: 1 },
            0xF0 => StatusKind::SysExStart,
            0xF1 | 0xF3 => StatusKind::SystemCommon { data_len: 1 },
            0xF2 => StatusKind::SystemCommon { data_len: 2 },
            0xF6 => StatusKind::SystemCommon { data_len: 0 },
            0xF7 => StatusKind::SysExEnd,
            0xF8..=0xFF => StatusKind::RealTime,
            _ => StatusKind::Undefined,
        }
    }
}

/// Whether `byte` is a status byte rather than a data byte.
pub fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// One complete MIDI message as it appeared on the wire (running status
/// expanded).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    bytes: Vec<u8>,
}

impl MidiMessage {
    /// Wrap raw bytes. The first byte is expected to be a status byte.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn status(&self) -> Option<u8> {
        self.bytes.first().copied().filter(|b| is_status(*b))
    }

    /// Channel (0-15) of a channel voice/mode message.
    pub fn channel(&self) -> Option<u8> {
        match self.status()? {
            status @ 0x80..=0xEF => Some(status & 0x0F),
            _ => None,
        }
    }

    pub fn is_realtime(&self) -> bool {
        matches!(self.status(), Some(0xF8..=0xFF))
    }

    pub fn is_sysex(&self) -> bool {
        self.status() == Some(0xF0)
    }

    /// Structured view of the message.
    pub fn live_event(&self) -> Result<LiveEvent<'_>, midly::Error> {
        LiveEvent::parse(&self.bytes)
    }
}

impl AsRef<[u8]> for MidiMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_lengths() {
        assert_eq!(StatusKind::of(0x80), StatusKind::Channel { data_len: 2 });
        assert_eq!(StatusKind::of(0x9F), StatusKind::Channel { data_len: 2 });
        assert_eq!(StatusKind::of(0xA3), StatusKind::Channel { data_len: 2 });
        assert_eq!(StatusKind::of(0xB0), StatusKind::Channel { data_len: 2 });
        assert_eq!(StatusKind::of(0xC5), StatusKind::Channel { data_len: 1 });
        assert_eq!(StatusKind::of(0xD0), StatusKind::Channel { data_len: 1 });
        assert_eq!(StatusKind::of(0xEF), StatusKind::Channel { data_len: 2 });
    }

    #[test]
    fn test_system_lengths() {
        assert_eq!(StatusKind::of(0xF0), StatusKind::SysExStart);
        assert_eq!(StatusKind::of(0xF1), StatusKind::SystemCommon { data_len: 1 });
        assert_eq!(StatusKind::of(0xF2), StatusKind::SystemCommon { data_len: 2 });
        assert_eq!(StatusKind::of(0xF3), StatusKind::SystemCommon { data_len: 1 });
        assert_eq!(StatusKind::of(0xF4), StatusKind::Undefined);
        assert_eq!(StatusKind::of(0xF5), StatusKind::Undefined);
        assert_eq!(StatusKind::of(0xF6), StatusKind::SystemCommon { data_len: 0 });
        assert_eq!(StatusKind::of(0xF7), StatusKind::SysExEnd);
        for status in 0xF8..=0xFF {
            assert_eq!(StatusKind::of(status), StatusKind::RealTime);
        }
    }

    #[test]
    fn test_message_accessors() {
        let msg = MidiMessage::from_bytes(vec![0x93, 0x40, 0x7F]);
        assert_eq!(msg.status(), Some(0x93));
        assert_eq!(msg.channel(), Some(3));
        assert!(!msg.is_realtime());
        assert_eq!(msg.to_string(), "93 40 7F");

        let clock = MidiMessage::from_bytes(vec![0xF8]);
        assert!(clock.is_realtime());
        assert_eq!(clock.channel(), None);

        let sysex = MidiMessage::from_bytes(vec![0xF0, 0x00, 0xF7]);
        assert!(sysex.is_sysex());
    }

    #[test]
    fn test_live_event_control_change() {
        let msg = MidiMessage::from_bytes(vec![0xB1, 0x63, 0x20]);
        match msg.live_event().unwrap() {
            LiveEvent::Midi {
                channel,
                message: midly::MidiMessage::Controller { controller, value },
            } => {
                assert_eq!(channel.as_int(), 1);
                assert_eq!(controller.as_int(), 0x63);
                assert_eq!(value.as_int(), 0x20);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
