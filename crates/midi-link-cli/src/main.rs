//! MIDI-Link CLI - bridge an Allen & Heath console to virtual MIDI ports.
//!
//! `discover` lists consoles answering the UDP probe; `bridge` connects to one
//! over TCP and exposes it as a virtual MIDI input/output pair until Ctrl+C.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use midi_link_core::config::Settings;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};
use output::{get_formatter, OutputFormatter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(&cli);

    let json = cli.json;
    match run(cli).await {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("{}", get_formatter(json).format_error(&e.to_string()));
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(cli: &Cli) {
    let directive = match (&cli.log_level, cli.verbose) {
        (Some(level), _) => level.as_str(),
        (None, true) => "debug",
        (None, false) => "info",
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    match &cli.config {
        Some(path) => Ok(Settings::load(path)?),
        None => match Settings::default_path() {
            Some(path) => Ok(Settings::load_or_default(&path)?),
            None => Ok(Settings::default()),
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Discover(args) => commands::run_discover(args, &settings, cli.json).await,
        Commands::Bridge(args) => commands::run_bridge(args, &settings, cli.json).await,
    }
}
