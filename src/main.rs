//! MIDI Mix bridge - command line entry point
//!
//! Opens the controller and the virtual endpoint, then runs one event loop
//! over inbound MIDI, config reloads and Ctrl+C.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midimix_bridge::config::{AppConfig, ConfigWatcher};
use midimix_bridge::transport::discovery;
use midimix_bridge::Bridge;

/// Bank-aware bridge between a MIDI Mix controller and a virtual MIDI port
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Do not reload the configuration file when it changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting MIDI Mix bridge v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load_or_default(&args.config).await?;

    if args.list_ports {
        discovery::print_ports(&config.physical.input_port, &config.virtual_port.input_port)?;
        return Ok(());
    }

    let mut bridge = Bridge::new(config);
    if !bridge.initialize() {
        anyhow::bail!(
            "Could not open the configured MIDI ports; run with --list-ports to see what is connected"
        );
    }

    let watcher = if args.no_watch {
        None
    } else {
        match ConfigWatcher::new(args.config.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Hot reload disabled: {:#}", e);
                None
            }
        }
    };

    run_app(bridge, watcher, shutdown_signal()).await?;

    info!("MIDI Mix bridge shutdown complete");
    Ok(())
}

async fn run_app(
    mut bridge: Bridge,
    mut watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let mut events = bridge
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Bridge event receiver already taken"))?;

    info!("Ready to process MIDI events!");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Inbound MIDI channel closed");
                    break;
                };
                bridge.handle_event(&event);
            }

            Some(new_config) = next_reload(&mut watcher) => {
                info!("Configuration file changed, applying...");
                bridge.apply_config(new_config);
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    bridge.shutdown();

    Ok(())
}

/// Next reloaded config, or never when hot reload is off
async fn next_reload(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
