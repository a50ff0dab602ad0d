//! MIDI-Link core library.
//!
//! Shared building blocks for bridging an Allen & Heath console's MIDI-over-TCP
//! protocol to host virtual MIDI ports:
//!
//! - [`discovery`]: UDP probe/reply discovery with a liveness-tracked registry
//! - [`protocol`]: running-status aware MIDI byte-stream tokenizer
//! - [`bridge`]: TCP session state machine and bridge engine
//! - [`midi`]: virtual MIDI port capability (and a `midir` backend)
//! - [`config`]: JSON settings with defaults

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod midi;
pub mod protocol;
pub mod shutdown;
pub mod types;

pub use bridge::{Bridge, BridgeConfig, ConnectionState, DeviceLookup};
pub use config::Settings;
pub use discovery::{Discovery, DiscoveryConfig};
pub use error::{CoreError, Result};
pub use protocol::{MidiMessage, MidiTokenizer};
