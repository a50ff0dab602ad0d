//! Console wire protocol.
//!
//! The TCP link carries a raw MIDI 1.0 byte stream with no additional
//! framing; this module turns it back into discrete messages.

pub mod message;
pub mod tokenizer;

pub use message::{MidiMessage, StatusKind};
pub use tokenizer::{Drain, MidiTokenizer};

/// TCP port the console serves its MIDI stream on.
pub const CONSOLE_PORT: u16 = 51325;
