//! Running-status aware MIDI byte-stream tokenizer.
//!
//! TCP delivers the console's MIDI stream in arbitrary chunks. The tokenizer
//! buffers whatever it is fed and hands back complete messages, carrying
//! running status, partially collected messages and SysEx state across calls.

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::message::{MidiMessage, StatusKind};

/// Stateful MIDI 1.0 stream decoder.
#[derive(Debug, Default)]
pub struct MidiTokenizer {
    input: VecDeque<u8>,
    running_status: Option<u8>,
    pending: Vec<u8>,
    /// Total length (status included) `pending` needs to be complete.
    expected: usize,
    in_sysex: bool,
}

impl MidiTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the stream.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Lazily decode buffered input into complete messages.
    ///
    /// Dropping the iterator early keeps the remaining input; the next call
    /// picks up where this one stopped.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { tokenizer: self }
    }

    /// Forget all framing context and buffered input.
    pub fn reset(&mut self) {
        self.input.clear();
        self.running_status = None;
        self.pending.clear();
        self.expected = 0;
        self.in_sysex = false;
    }

    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// True while a message (including SysEx) is partially collected.
    pub fn has_partial(&self) -> bool {
        self.in_sysex || !self.pending.is_empty()
    }

    fn push(&mut self, byte: u8) -> Option<MidiMessage> {
        if byte < 0x80 {
            return self.push_data(byte);
        }

        match StatusKind::of(byte) {
            // Real-time bytes never touch the message in progress.
            StatusKind::RealTime => Some(MidiMessage::from_bytes(vec![byte])),
            StatusKind::Channel { data_len } => {
                self.abandon_partial(byte);
                self.running_status = Some(byte);
                self.begin(byte, data_len)
            }
            StatusKind::SysExStart => {
                self.abandon_partial(byte);
                self.running_status = None;
                self.in_sysex = true;
                self.pending.push(byte);
                None
            }
            StatusKind::SysExEnd if self.in_sysex => {
                self.in_sysex = false;
                self.pending.push(byte);
                Some(self.take_pending())
            }
            StatusKind::SysExEnd => {
                self.abandon_partial(byte);
                self.running_status = None;
                Some(MidiMessage::from_bytes(vec![byte]))
            }
            StatusKind::SystemCommon { data_len } => {
                self.abandon_partial(byte);
                self.running_status = None;
                self.begin(byte, data_len)
            }
            StatusKind::Undefined => {
                warn!(status = format_args!("{:#04X}", byte), "Skipping undefined status byte");
                None
            }
        }
    }

    fn push_data(&mut self, byte: u8) -> Option<MidiMessage> {
        if self.in_sysex {
            self.pending.push(byte);
            return None;
        }

        if self.pending.is_empty() {
            match self.running_status {
                Some(status) => {
                    self.pending.push(status);
                    self.expected = 1 + channel_data_len(status);
                }
                None => {
                    debug!(byte = format_args!("{:#04X}", byte), "Skipping data byte without status");
                    return None;
                }
            }
        }

        self.pending.push(byte);
        if self.pending.len() >= self.expected {
            Some(self.take_pending())
        } else {
            None
        }
    }

    fn begin(&mut self, status: u8, data_len: usize) -> Option<MidiMessage> {
        if data_len == 0 {
            return Some(MidiMessage::from_bytes(vec![status]));
        }
        self.pending.push(status);
        self.expected = 1 + data_len;
        None
    }

    fn take_pending(&mut self) -> MidiMessage {
        self.expected = 0;
        MidiMessage::from_bytes(std::mem::take(&mut self.pending))
    }

    /// Drop an incomplete message interrupted by a new status byte.
    fn abandon_partial(&mut self, status: u8) {
        if self.has_partial() {
            debug!(
                status = format_args!("{:#04X}", status),
                dropped = self.pending.len(),
                sysex = self.in_sysex,
                "Incomplete message interrupted by new status"
            );
            self.pending.clear();
            self.expected = 0;
            self.in_sysex = false;
        }
    }
}

fn channel_data_len(status: u8) -> usize {
    match StatusKind::of(status) {
        StatusKind::Channel { data_len } => data_len,
        _ => 0,
    }
}

/// Iterator over the complete messages currently buffered.
pub struct Drain<'a> {
    tokenizer: &'a mut MidiTokenizer,
}

impl Iterator for Drain<'_> {
    type Item = MidiMessage;

    fn next(&mut self) -> Option<MidiMessage> {
        while let Some(byte) = self.tokenizer.input.pop_front() {
            if let Some(message) = self.tokenizer.push(byte) {
                return Some(message);
            }
        }
        None
    }
}
