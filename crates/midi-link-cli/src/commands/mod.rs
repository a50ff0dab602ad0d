//! Command implementations.

pub mod bridge;
pub mod discover;

pub use bridge::run_bridge;
pub use discover::run_discover;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use midi_link_core::shutdown::{self, ShutdownSignal};
use tracing::{info, warn};

/// Shutdown signal fired by SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub fn shutdown_on_signals() -> ShutdownSignal {
    let (trigger, signal) = shutdown::channel();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown requested");
        trigger.trigger();
    });

    signal
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Spinner shown on stderr while discovery runs. Hidden for JSON output.
fn discovery_spinner(json: bool, duration: Duration) -> ProgressBar {
    if json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!(
        "Searching for consoles for {} seconds...",
        duration.as_secs()
    ));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
