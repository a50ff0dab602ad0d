//! Discover command implementation.

use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use midi_link_core::config::Settings;
use midi_link_core::Discovery;

use super::{discovery_spinner, shutdown_on_signals};
use crate::cli::DiscoverArgs;
use crate::error::CliError;
use crate::output::{get_formatter, OutputFormatter};

/// Run the discover command
pub async fn run_discover(args: DiscoverArgs, settings: &Settings, json: bool) -> Result<(), CliError> {
    let formatter = get_formatter(json);

    if args.watch {
        run_watch_mode(settings, json, formatter.as_ref()).await
    } else {
        run_oneshot_mode(settings, Duration::from_secs(args.duration), json, formatter.as_ref()).await
    }
}

async fn run_oneshot_mode(
    settings: &Settings,
    duration: Duration,
    json: bool,
    formatter: &dyn OutputFormatter,
) -> Result<(), CliError> {
    let spinner = discovery_spinner(json, duration);
    let devices = Discovery::discover_once(settings.to_discovery_config(), duration).await;
    spinner.finish_and_clear();

    let devices = devices?;
    println!("{}", formatter.format_devices(&devices));

    if devices.is_empty() {
        return Err(CliError::NoDevicesFound);
    }

    Ok(())
}

async fn run_watch_mode(
    settings: &Settings,
    json: bool,
    formatter: &dyn OutputFormatter,
) -> Result<(), CliError> {
    if !json {
        println!("Watching for consoles (press Ctrl+C to stop)...\n");
    }

    let shutdown = shutdown_on_signals();

    Discovery::watch(settings.to_discovery_config(), shutdown, |devices| {
        if json {
            println!("{}", formatter.format_devices(devices));
        } else {
            // Clear screen and print header
            print!("\x1B[2J\x1B[1;1H");
            println!("{}", "MIDI-Link Console Watch".bold());
            println!("{}", "Press Ctrl+C to stop".dimmed());
            println!();
            println!("{}", formatter.format_devices(devices));
        }

        io::stdout().flush().ok();
    })
    .await?;

    Ok(())
}
