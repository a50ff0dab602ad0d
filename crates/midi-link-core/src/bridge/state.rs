//! Connection state machine.
//!
//! The bridge loop turns everything that happens to a session (ticks, connect
//! results, reads, silence verdicts) into a [`LinkEvent`] and asks the current
//! [`ConnectionState`] what to do next.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Where the TCP session to the console stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Something that happened during one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A poll interval elapsed.
    Tick,
    ConnectSucceeded,
    /// Connect failed with an error; the attempt is abandoned.
    ConnectFailed,
    /// Ports need the console's name but discovery does not know it yet.
    PortsUnnamed,
    /// Bytes arrived from the console.
    DataReceived,
    /// The console closed the connection (empty read).
    PeerClosed,
    /// Reading or writing the socket failed.
    LinkFailed,
    /// The idle timer expired; `peer_live` is discovery's verdict.
    Silence { peer_live: bool },
}

/// What the loop must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Start a connect attempt unless one is already in flight.
    Dial,
    /// Leave the failed attempt behind; the next tick dials again.
    Wait,
    /// Make sure the virtual ports exist.
    OpenPorts,
    /// Feed received bytes through the tokenizer to the virtual output.
    Forward,
    /// Account a quiet tick against the idle timer.
    CheckIdle,
    /// Silence is tolerated; start the idle timer over.
    ResetIdle,
    /// End this session and start a fresh one.
    Restart,
    Ignore,
}

/// Result of feeding an event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ConnectionState,
    pub action: LinkAction,
}

impl Transition {
    fn to(next: ConnectionState, action: LinkAction) -> Self {
        Self { next, action }
    }
}

impl ConnectionState {
    /// Transition function of the session state machine.
    pub fn on(self, event: LinkEvent) -> Transition {
        use ConnectionState::*;
        use LinkAction as A;
        use LinkEvent as E;

        match (self, event) {
            (Disconnected, E::Tick) => Transition::to(Connecting, A::Dial),

            (Connecting, E::Tick) => Transition::to(Connecting, A::Dial),
            (Connecting, E::ConnectFailed) => Transition::to(Connecting, A::Wait),
            (Connecting, E::ConnectSucceeded) => Transition::to(Connected, A::OpenPorts),

            (Connected, E::DataReceived) => Transition::to(Connected, A::Forward),
            (Connected, E::Tick) => Transition::to(Connected, A::CheckIdle),
            (Connected, E::Silence { peer_live: true }) => {
                Transition::to(Connected, A::ResetIdle)
            }
            (Connected, E::Silence { peer_live: false })
            | (Connected, E::PeerClosed)
            | (Connected, E::LinkFailed)
            | (Connected, E::PortsUnnamed) => Transition::to(Disconnected, A::Restart),

            (state, _) => Transition::to(state, A::Ignore),
        }
    }
}

/// Counts quiet poll intervals while connected.
#[derive(Debug, Clone)]
pub struct IdleWatchdog {
    idle: Duration,
    timeout: Duration,
}

impl IdleWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            idle: Duration::ZERO,
            timeout,
        }
    }

    /// Add one quiet poll interval. Returns true once the timeout is reached.
    pub fn on_quiet_tick(&mut self, poll: Duration) -> bool {
        self.idle += poll;
        self.idle >= self.timeout
    }

    pub fn reset(&mut self) {
        self.idle = Duration::ZERO;
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }
}
