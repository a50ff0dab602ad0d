//! The bridge task: one TCP session at a time, restarted on any fault.

use std::future::{self, Future};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use super::naming::PortNaming;
use super::session::SessionWriter;
use super::state::{ConnectionState, IdleWatchdog, LinkAction, LinkEvent, Transition};
use crate::discovery::DeviceLookup;
use crate::error::BridgeError;
use crate::midi::{MidiPorts, VirtualMidiHost, BASE_PORT_NAME};
use crate::protocol::{MidiTokenizer, CONSOLE_PORT};
use crate::shutdown::{self, ShutdownSignal, ShutdownTrigger};

const READ_BUFFER_SIZE: usize = 1024;

/// Bridge settings for one console.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub peer: Ipv4Addr,
    pub port: u16,
    /// Upper bound on one loop iteration's wait.
    pub poll_interval: Duration,
    /// Silence after which discovery is asked whether the console is still there.
    pub idle_timeout: Duration,
    pub naming: PortNaming,
    /// Generic port name, and the prefix of console-named ports.
    pub port_name: String,
}

impl BridgeConfig {
    pub fn new(peer: Ipv4Addr) -> Self {
        Self {
            peer,
            port: CONSOLE_PORT,
            poll_interval: Duration::from_millis(500),
            idle_timeout: Duration::from_secs(5),
            naming: PortNaming::default(),
            port_name: BASE_PORT_NAME.to_string(),
        }
    }

    pub fn with_flags(mut self, no_wait: bool, no_name: bool) -> Self {
        self.naming = PortNaming::from_flags(no_wait, no_name);
        self
    }

    pub fn peer_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.peer, self.port))
    }
}

/// Bidirectional MIDI bridge to one console.
///
/// Owns the virtual ports for its whole lifetime. They survive reconnects
/// and are closed by [`Bridge::stop`].
pub struct Bridge {
    config: BridgeConfig,
    lookup: Arc<dyn DeviceLookup>,
    host: Option<Box<dyn VirtualMidiHost>>,
    writer: SessionWriter,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown: Option<ShutdownTrigger>,
    task: Option<JoinHandle<MidiPorts>>,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        lookup: Arc<dyn DeviceLookup>,
        host: Box<dyn VirtualMidiHost>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            writer: SessionWriter::new(config.peer),
            config,
            lookup,
            host: Some(host),
            state_tx,
            state_rx,
            shutdown: None,
            task: None,
        }
    }

    /// Spawn the bridge loop. With [`PortNaming::Immediate`] the ports are
    /// created here, before any connection attempt.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        let Some(mut host) = self.host.take() else {
            return Err(BridgeError::AlreadyStarted);
        };

        let mut ports = MidiPorts::new();
        if self.config.naming.creates_at_startup() {
            let writer = self.writer.clone();
            if let Err(e) =
                ports.ensure(host.as_mut(), &self.config.port_name, move || writer.input_callback())
            {
                ports.close();
                self.host = Some(host);
                return Err(e.into());
            }
        }

        let (trigger, signal) = shutdown::channel();
        let engine = Engine {
            config: self.config.clone(),
            lookup: self.lookup.clone(),
            host,
            ports,
            tokenizer: MidiTokenizer::new(),
            writer: self.writer.clone(),
            state: ConnectionState::Disconnected,
            state_tx: self.state_tx.clone(),
            shutdown: signal,
        };

        info!(peer = %self.config.peer_addr(), "Starting MIDI bridge");
        self.shutdown = Some(trigger);
        self.task = Some(tokio::spawn(engine.run()));
        Ok(())
    }

    /// Stop the loop and close the virtual ports. Safe to call more than once.
    pub async fn stop(&mut self) {
        if let Some(trigger) = self.shutdown.take() {
            trigger.trigger();
        }
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(mut ports) => ports.close(),
                Err(e) => error!(error = %e, "Bridge task failed"),
            }
        }
        self.writer.close();
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Send one message's bytes to the console.
    ///
    /// Returns [`BridgeError::NotConnected`] unless a session is connected.
    pub fn send(&self, message: &[u8]) -> Result<(), BridgeError> {
        self.writer.send(message)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

}

type DialFuture = Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send>>;

/// An established connection.
struct Link {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    outgoing: UnboundedReceiver<Vec<u8>>,
}

enum Wake {
    Shutdown,
    Tick,
    Dialed(io::Result<TcpStream>),
    Read(io::Result<usize>),
    Outgoing(Option<Vec<u8>>),
}

enum SessionEnd {
    Shutdown,
    Restart(LinkEvent),
}

struct Engine {
    config: BridgeConfig,
    lookup: Arc<dyn DeviceLookup>,
    host: Box<dyn VirtualMidiHost>,
    ports: MidiPorts,
    tokenizer: MidiTokenizer,
    writer: SessionWriter,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: ShutdownSignal,
}

impl Engine {
    async fn run(mut self) -> MidiPorts {
        loop {
            self.reset_session();
            match self.run_session().await {
                SessionEnd::Shutdown => break,
                SessionEnd::Restart(cause) => {
                    debug!(peer = %self.config.peer, cause = ?cause, "Restarting session");
                }
            }
        }
        self.reset_session();
        info!(peer = %self.config.peer, "MIDI bridge stopped");
        self.ports
    }

    fn reset_session(&mut self) {
        self.writer.close();
        self.tokenizer.reset();
        self.set_state(ConnectionState::Disconnected);
    }

    async fn run_session(&mut self) -> SessionEnd {
        let poll = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut idle = IdleWatchdog::new(self.config.idle_timeout);
        let mut dial: Option<DialFuture> = None;
        let mut link: Option<Link> = None;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            if self.shutdown.is_triggered() {
                return SessionEnd::Shutdown;
            }

            // Unbiased: a console that keeps the socket readable must not
            // starve host messages or the ticker.
            let wake = {
                let (reader, outgoing) = match link.as_mut() {
                    Some(link) => (Some(&mut link.reader), Some(&mut link.outgoing)),
                    None => (None, None),
                };
                tokio::select! {
                    _ = self.shutdown.triggered() => Wake::Shutdown,
                    read = read_some(reader, &mut buf) => Wake::Read(read),
                    message = next_outgoing(outgoing) => Wake::Outgoing(message),
                    dialed = dial_progress(&mut dial) => Wake::Dialed(dialed),
                    _ = ticker.tick() => Wake::Tick,
                }
            };

            let event = match wake {
                Wake::Shutdown => return SessionEnd::Shutdown,
                Wake::Tick => LinkEvent::Tick,
                Wake::Dialed(Ok(stream)) => {
                    dial = None;
                    info!(peer = %self.config.peer_addr(), "Connected to console");
                    let (reader, writer) = stream.into_split();
                    link = Some(Link {
                        reader,
                        writer,
                        outgoing: self.writer.open(),
                    });
                    LinkEvent::ConnectSucceeded
                }
                Wake::Dialed(Err(e)) => {
                    dial = None;
                    self.log_connect_error(&e);
                    LinkEvent::ConnectFailed
                }
                Wake::Read(Ok(0)) => {
                    info!(peer = %self.config.peer, "Connection lost");
                    LinkEvent::PeerClosed
                }
                Wake::Read(Ok(n)) => {
                    trace!(len = n, "Console -> host bytes");
                    self.tokenizer.feed(&buf[..n]);
                    LinkEvent::DataReceived
                }
                Wake::Read(Err(e)) => {
                    if e.kind() == io::ErrorKind::ConnectionReset {
                        info!(peer = %self.config.peer, "Connection reset by console");
                    } else {
                        warn!(peer = %self.config.peer, error = %e, "Read from console failed");
                    }
                    LinkEvent::LinkFailed
                }
                Wake::Outgoing(Some(bytes)) => {
                    let Some(link) = link.as_mut() else { continue };
                    match write_to_console(&mut link.writer, &bytes, poll).await {
                        Ok(()) => continue,
                        Err(e) => {
                            warn!(peer = %self.config.peer, error = %e, "Write to console failed");
                            LinkEvent::LinkFailed
                        }
                    }
                }
                Wake::Outgoing(None) => continue,
            };

            let mut pending = Some(event);
            while let Some(event) = pending.take() {
                let Transition { next, action } = self.state.on(event);
                self.set_state(next);

                pending = match action {
                    LinkAction::Dial => {
                        if dial.is_none() && link.is_none() {
                            debug!(peer = %self.config.peer_addr(), "Connecting");
                            dial = Some(Box::pin(TcpStream::connect(self.config.peer_addr())));
                        }
                        None
                    }
                    LinkAction::OpenPorts => {
                        idle.reset();
                        if self.open_ports() {
                            None
                        } else {
                            Some(LinkEvent::PortsUnnamed)
                        }
                    }
                    LinkAction::Forward => {
                        idle.reset();
                        self.forward_decoded();
                        None
                    }
                    LinkAction::CheckIdle => {
                        if idle.on_quiet_tick(poll) {
                            let peer_live = self.lookup.is_live(self.config.peer);
                            if peer_live {
                                debug!(
                                    peer = %self.config.peer,
                                    idle = ?idle.idle(),
                                    "Console silent but still discoverable"
                                );
                            } else {
                                info!(
                                    peer = %self.config.peer,
                                    idle = ?idle.idle(),
                                    "Nothing received and console not discoverable, reconnecting"
                                );
                            }
                            Some(LinkEvent::Silence { peer_live })
                        } else {
                            None
                        }
                    }
                    LinkAction::ResetIdle => {
                        idle.reset();
                        None
                    }
                    LinkAction::Restart => return SessionEnd::Restart(event),
                    LinkAction::Wait | LinkAction::Ignore => None,
                };
            }
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Connection state changed");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }

    /// Create the ports if they do not exist yet. Returns false when the
    /// console's name is required but unknown.
    fn open_ports(&mut self) -> bool {
        if self.ports.is_open() {
            return true;
        }

        let device_name = self.lookup.name_for_address(self.config.peer);
        let Some(name) = self.config.naming.port_name(&self.config.port_name, device_name) else {
            info!(peer = %self.config.peer, "Console name not discovered yet, retrying");
            return false;
        };

        let writer = self.writer.clone();
        if let Err(e) = self
            .ports
            .ensure(self.host.as_mut(), &name, move || writer.input_callback())
        {
            error!(port = %name, error = %e, "Failed to open virtual MIDI ports");
        }
        true
    }

    fn forward_decoded(&mut self) {
        for message in self.tokenizer.drain() {
            trace!(msg = %message, "Console -> host");
            if let Err(e) = self.ports.forward(&message) {
                warn!(msg = %message, error = %e, "Failed to deliver MIDI message");
            }
        }
    }

    fn log_connect_error(&self, e: &io::Error) {
        if is_expected_connect_error(e) {
            debug!(peer = %self.config.peer_addr(), error = %e, "Console not reachable");
        } else {
            warn!(peer = %self.config.peer_addr(), error = %e, "Connect failed");
        }
    }
}

/// Errors that just mean the console is not up yet.
fn is_expected_connect_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::ConnectionReset
    )
}

/// Write one host message, giving up after `limit`.
async fn write_to_console(
    writer: &mut OwnedWriteHalf,
    bytes: &[u8],
    limit: Duration,
) -> io::Result<()> {
    trace!(len = bytes.len(), "Host -> console bytes");
    match tokio::time::timeout(limit, writer.write_all(bytes)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
    }
}

async fn read_some(reader: Option<&mut OwnedReadHalf>, buf: &mut [u8]) -> io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => future::pending().await,
    }
}

async fn next_outgoing(outgoing: Option<&mut UnboundedReceiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match outgoing {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn dial_progress(dial: &mut Option<DialFuture>) -> io::Result<TcpStream> {
    match dial.as_mut() {
        Some(connect) => connect.await,
        None => future::pending().await,
    }
}
