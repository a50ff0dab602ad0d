//! Host virtual MIDI ports.
//!
//! The bridge only needs to open a named virtual input (which calls back for
//! every message host software sends) and a named virtual output. The OS side
//! is abstracted behind [`VirtualMidiHost`]; [`MidirHost`] provides it through
//! midir where the platform supports virtual ports.

#[cfg(feature = "virtual-midi")]
pub mod midir_host;
pub mod ports;

#[cfg(feature = "virtual-midi")]
pub use midir_host::MidirHost;
pub use ports::{InputCallback, MidiPorts, VirtualInput, VirtualMidiHost, VirtualOutput};

/// MIDI client name the ports are registered under.
pub const CLIENT_NAME: &str = "MIDI-TCP for Allen & Heath";

/// Port name used when the console name is not wanted or not known.
pub const BASE_PORT_NAME: &str = "Allen & Heath Desk";
