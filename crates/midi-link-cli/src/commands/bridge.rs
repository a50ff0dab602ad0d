//! Bridge command implementation.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use midi_link_core::bridge::PortNaming;
use midi_link_core::config::Settings;
use midi_link_core::midi::MidirHost;
use midi_link_core::shutdown::ShutdownSignal;
use midi_link_core::{Bridge, Discovery};
use tracing::{info, warn};

use super::{discovery_spinner, shutdown_on_signals};
use crate::cli::BridgeArgs;
use crate::error::CliError;
use crate::output::{get_formatter, OutputFormatter};

/// Run the bridge command until interrupted
pub async fn run_bridge(args: BridgeArgs, settings: &Settings, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    // Discovery runs for the whole session: it names the ports and tells the
    // bridge whether a silent console is still on the network.
    let mut discovery = Discovery::new(settings.to_discovery_config());
    discovery.start()?;

    let result = bridge_until_shutdown(&args, settings, json, &discovery, formatter.as_ref()).await;

    discovery.stop().await;
    result
}

async fn bridge_until_shutdown(
    args: &BridgeArgs,
    settings: &Settings,
    json: bool,
    discovery: &Discovery,
    formatter: &dyn OutputFormatter,
) -> Result<(), CliError> {
    let mut shutdown = shutdown_on_signals();

    let peer = match args.address {
        Some(ip) => {
            warn_if_public(ip);
            ip
        }
        None => {
            let duration = Duration::from_secs(args.discovery_duration);
            let spinner = discovery_spinner(json, duration);
            let completed = wait_for_discovery(duration, &mut shutdown).await;
            spinner.finish_and_clear();
            if !completed {
                info!("Interrupted while searching for consoles");
                return Ok(());
            }
            select_console(discovery)?
        }
    };

    let naming = PortNaming::from_flags(args.no_wait, args.no_name);
    let config = settings.to_bridge_config(peer, naming);
    let host = MidirHost::new(settings.bridge.client_name.clone());

    let mut bridge = Bridge::new(config, Arc::new(discovery.lookup()), Box::new(host));
    bridge.start()?;

    if !json {
        println!(
            "{}",
            formatter.format_message(&format!("Bridging {} (press Ctrl+C to stop)", peer))
        );
    }

    let mut states = bridge.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.triggered() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                println!("{}", formatter.format_bridge_state(peer, state));
            }
        }
    }

    bridge.stop().await;
    info!(peer = %peer, "Bridge closed");
    Ok(())
}

/// Let discovery listen for `duration`. Returns false if shutdown came first.
async fn wait_for_discovery(duration: Duration, shutdown: &mut ShutdownSignal) -> bool {
    tokio::select! {
        _ = shutdown.triggered() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Pick the target when no address was given: exactly one console must be live.
fn select_console(discovery: &Discovery) -> Result<Ipv4Addr, CliError> {
    let devices = discovery.devices();
    match devices.as_slice() {
        [] => Err(CliError::NoDevicesFound),
        [device] => {
            info!(ip = %device.ip, name = %device.name, "Using discovered console");
            Ok(device.ip)
        }
        _ => Err(CliError::AmbiguousDevice(
            devices.iter().map(|device| device.ip).collect(),
        )),
    }
}

/// Consoles live on private networks; anything else is most likely a typo.
fn warn_if_public(ip: Ipv4Addr) {
    if !is_private_host(ip) {
        warn!(ip = %ip, "Console address is not a private-network host address");
    }
}

/// Private-range address that is neither the network nor the broadcast
/// address of its block.
fn is_private_host(ip: Ipv4Addr) -> bool {
    let (network, broadcast) = match ip.octets() {
        [10, ..] => ([10, 0, 0, 0], [10, 255, 255, 255]),
        [172, 16..=31, ..] => ([172, 16, 0, 0], [172, 31, 255, 255]),
        [192, 168, ..] => ([192, 168, 0, 0], [192, 168, 255, 255]),
        _ => return false,
    };
    ip != Ipv4Addr::from(network) && ip != Ipv4Addr::from(broadcast)
}
