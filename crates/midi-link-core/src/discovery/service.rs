//! Discovery service: probe broadcaster and reply listener.
//!
//! Uses a broadcast-enabled socket on an ephemeral port; consoles answer the
//! probe to the source address.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::probe::{parse_reply, ProbeSchedule, DISCOVERY_PORT, PROBE_PAYLOAD};
use super::registry::{DeviceLookup, DeviceRegistry, Observation};
use crate::error::DiscoveryError;
use crate::shutdown::{self, ShutdownSignal, ShutdownTrigger};
use crate::types::DiscoveredDevice;

/// Discovery timing and addressing.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Where probes are sent.
    pub target: SocketAddr,
    /// Upper bound on each receive wait.
    pub poll_interval: Duration,
    /// Time between probes.
    pub retransmit_interval: Duration,
    /// A console is forgotten once it has been silent this long.
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, DISCOVERY_PORT)),
            poll_interval: Duration::from_millis(500),
            retransmit_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Create a non-blocking UDP socket that may send to the broadcast address.
pub fn create_broadcast_socket() -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;

    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
    socket.bind(&addr.into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// Background discovery of consoles on the local network.
pub struct Discovery {
    config: DiscoveryConfig,
    registry: DeviceRegistry,
    shutdown: Option<ShutdownTrigger>,
    task: Option<JoinHandle<()>>,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        let registry = DeviceRegistry::new(config.timeout);
        Self {
            config,
            registry,
            shutdown: None,
            task: None,
        }
    }

    /// Open the socket and spawn the probe/listen loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), DiscoveryError> {
        if self.task.is_some() {
            return Err(DiscoveryError::AlreadyStarted);
        }

        let socket = UdpSocket::from_std(create_broadcast_socket()?)?;
        let (trigger, signal) = shutdown::channel();
        let config = self.config.clone();
        let registry = self.registry.clone();

        info!(target = %config.target, "Starting console discovery");
        self.task = Some(tokio::spawn(run_discovery(
            socket,
            config,
            registry,
            signal,
            |_: &[DiscoveredDevice]| {},
        )));
        self.shutdown = Some(trigger);
        Ok(())
    }

    /// Stop the loop and wait for it to exit. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        if let Some(trigger) = self.shutdown.take() {
            info!("Stopping console discovery");
            trigger.trigger();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Discovery task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Name of the live console at `ip`.
    pub fn name_for_address(&self, ip: Ipv4Addr) -> Option<String> {
        self.registry.name_for_address(ip)
    }

    /// Live consoles sorted by address.
    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        self.registry.devices()
    }

    /// Shared registry handle, suitable as the bridge's device lookup.
    pub fn lookup(&self) -> DeviceRegistry {
        self.registry.clone()
    }

    /// Discover consoles for a given duration and return the result.
    pub async fn discover_once(
        config: DiscoveryConfig,
        duration: Duration,
    ) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        let mut discovery = Discovery::new(config);
        discovery.start()?;
        tokio::time::sleep(duration).await;
        let devices = discovery.devices();
        discovery.stop().await;
        Ok(devices)
    }

    /// Run discovery until `shutdown` fires, calling `on_update` whenever a
    /// console appears, is renamed, or is evicted.
    pub async fn watch<F>(
        config: DiscoveryConfig,
        shutdown: ShutdownSignal,
        on_update: F,
    ) -> Result<(), DiscoveryError>
    where
        F: FnMut(&[DiscoveredDevice]),
    {
        let socket = UdpSocket::from_std(create_broadcast_socket()?)?;
        let registry = DeviceRegistry::new(config.timeout);
        run_discovery(socket, config, registry, shutdown, on_update).await;
        Ok(())
    }
}

async fn run_discovery<F>(
    socket: UdpSocket,
    config: DiscoveryConfig,
    registry: DeviceRegistry,
    mut shutdown: ShutdownSignal,
    mut on_update: F,
) where
    F: FnMut(&[DiscoveredDevice]),
{
    let mut schedule = ProbeSchedule::new(config.retransmit_interval);
    let mut buf = vec![0u8; 1024];

    loop {
        let now = Instant::now();
        if schedule.is_due(now) {
            debug!("Transmitting discovery probe");
            if let Err(e) = socket.send_to(PROBE_PAYLOAD, config.target).await {
                warn!(error = %e, "Failed to send discovery probe");
            }
            schedule.mark_sent(now);
        }

        let wait = config
            .poll_interval
            .min(schedule.until_due(Instant::now()));
        let deadline = tokio::time::Instant::now() + wait;

        let received = tokio::select! {
            _ = shutdown.triggered() => break,
            received = timeout(wait, socket.recv_from(&mut buf)) => match received {
                Ok(received) => on_receive(&registry, received, &buf),
                // Poll timeout - continue to prune
                Err(_) => Received::Handled(false),
            },
        };

        let changed = match received {
            Received::Handled(changed) => changed,
            Received::Failed => {
                // Sit out the rest of this poll before touching the socket again.
                tokio::select! {
                    _ = shutdown.triggered() => break,
                    _ = tokio::time::sleep_until(deadline) => false,
                }
            }
        };

        let evicted = registry.evict_stale();
        for ip in &evicted {
            info!(ip = %ip, "Console no longer discoverable");
        }

        if changed || !evicted.is_empty() {
            on_update(&registry.devices());
        }
    }

    debug!("Discovery loop stopped");
}

/// Record a reply. Returns true when the visible device list changed.
fn handle_reply(registry: &DeviceRegistry, ip: Ipv4Addr, payload: &[u8]) -> bool {
    let Some(name) = parse_reply(payload) else {
        trace!(ip = %ip, len = payload.len(), "Ignoring discovery datagram");
        return false;
    };

    match registry.observe(ip, &name) {
        Observation::New => {
            info!(ip = %ip, name = %name, "Discovered console");
            true
        }
        Observation::Renamed => {
            info!(ip = %ip, name = %name, "Console renamed");
            true
        }
        Observation::Refreshed => {
            trace!(ip = %ip, "Console still present");
            false
        }
    }
}

/// Outcome of one receive wait.
#[derive(Debug, PartialEq, Eq)]
enum Received {
    /// Nothing arrived or the datagram was handled; true when the device list changed.
    Handled(bool),
    /// The socket reported an error; the loop backs off until the poll deadline.
    Failed,
}

fn on_receive(
    registry: &DeviceRegistry,
    received: io::Result<(usize, SocketAddr)>,
    buf: &[u8],
) -> Received {
    match received {
        Ok((len, SocketAddr::V4(source))) => {
            Received::Handled(handle_reply(registry, *source.ip(), &buf[..len]))
        }
        Ok((_, source)) => {
            trace!(%source, "Ignoring non-IPv4 discovery reply");
            Received::Handled(false)
        }
        Err(ref e) if is_transient(e) => Received::Handled(false),
        // ICMP port-unreachable surfaces as a reset on some platforms
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
            debug!(error = %e, "Discovery receive reset");
            Received::Failed
        }
        Err(e) => {
            warn!(error = %e, "Discovery receive error");
            Received::Failed
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
