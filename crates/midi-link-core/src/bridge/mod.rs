//! TCP bridge between a console and the host's virtual MIDI ports.

pub mod engine;
pub mod naming;
pub mod session;
pub mod state;

pub use crate::discovery::DeviceLookup;
pub use engine::{Bridge, BridgeConfig};
pub use naming::PortNaming;
pub use session::SessionWriter;
pub use state::{ConnectionState, IdleWatchdog, LinkAction, LinkEvent, Transition};
