//! CLI argument definitions using clap.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// MIDI-Link - bridge an Allen & Heath console's MIDI-over-TCP to virtual MIDI ports
#[derive(Parser, Debug)]
#[command(name = "midi-link")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter, e.g. "info" or "midi_link_core=trace"
    #[arg(long, global = true, env = "MIDI_LINK_LOG")]
    pub log_level: Option<String>,

    /// Settings file (default: platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List consoles on the local network
    Discover(DiscoverArgs),

    /// Bridge a console to virtual MIDI ports
    Bridge(BridgeArgs),
}

// ==================== Discover ====================

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Watch mode - keep listing consoles until interrupted
    #[arg(short, long)]
    pub watch: bool,

    /// Discovery duration in seconds (ignored in watch mode)
    #[arg(short, long, default_value = "5")]
    pub duration: u64,
}

// ==================== Bridge ====================

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Console IPv4 address (default: the single console found by discovery)
    #[arg(short, long, value_parser = parse_console_address)]
    pub address: Option<Ipv4Addr>,

    /// Use the generic port name instead of the console's name
    #[arg(short = 'n', long)]
    pub no_name: bool,

    /// Create the ports immediately, without waiting for a connection (implies --no-name)
    #[arg(short = 'w', long)]
    pub no_wait: bool,

    /// How long to search for a console when no address is given (seconds)
    #[arg(long, default_value = "3")]
    pub discovery_duration: u64,
}

/// Parse a console address: a dotted-quad IPv4 address that is neither the
/// unspecified nor the broadcast address.
pub fn parse_console_address(value: &str) -> Result<Ipv4Addr, String> {
    let ip: Ipv4Addr = value
        .parse()
        .map_err(|_| format!("'{}' is not a valid IPv4 address", value))?;

    if ip.is_unspecified() || ip.is_broadcast() {
        return Err(format!("'{}' cannot be used as a console address", value));
    }
    Ok(ip)
}
