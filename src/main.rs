//! APC40 mixer bridge
//!
//! Drives an in-memory mixer and clip launcher from an Akai APC40.

use anyhow::Result;
use apc40_mixer::config::{AppConfig, ConfigWatcher};
use apc40_mixer::host::MemoryHost;
use apc40_mixer::port::{discovery, Apc40Port};
use apc40_mixer::{DeviceRegistry, MixerSurface};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pads show play state colors (mode 0 paints every pad red)
const PAD_MODE: u8 = 1;

/// APC40 mixer bridge - mixer strips, clip launcher and LED feedback
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
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        discovery::list_ports_formatted();
        return Ok(());
    }

    info!("Starting APC40 mixer bridge...");
    info!("Configuration file: {}", args.config);

    let (config_watcher, initial_config) = ConfigWatcher::new(args.config.clone()).await?;
    info!("Configuration loaded with hot-reload enabled");

    run_app((*initial_config).clone(), config_watcher, shutdown_signal()).await?;

    info!("APC40 mixer bridge shutdown complete");
    Ok(())
}

async fn run_app(
    config: AppConfig,
    mut config_watcher: ConfigWatcher,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let host = MemoryHost::new(&config.host);
    let device = config.midi.device_index;

    let mut port = Apc40Port::new(&config.midi);
    port.connect()?;
    let mut events = port
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Failed to get APC40 event receiver"))?;

    let surface = MixerSurface::new(
        device,
        config.surface.clone(),
        host.collaborators(),
        Arc::new(port.sink()),
    );
    let mut registry = DeviceRegistry::new();
    registry.register(device, Box::new(surface))?;
    registry.activate(device);
    render_grid(&host, &mut registry);
    let sent = port.flush();
    info!("APC40 initialised ({} messages)", sent);

    let mut bar = tokio::time::interval(Duration::from_millis(config.host.bar_ms));

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(word) = events.recv() => {
                let consumed = registry.handle_event(word.0);
                debug!("Event {} consumed={}", word, consumed);

                sync_pads(&host, &mut registry);
                for (strip, control) in host.refresh.take() {
                    debug!("Host refresh requested for {:?} {:?}", strip, control);
                }
                port.flush();
            }

            _ = bar.tick() => {
                host.sequencer.advance();
                sync_pads(&host, &mut registry);
                port.flush();
            }

            Some(new_config) = config_watcher.next_config() => {
                info!("Configuration file changed, applying...");
                let pending = new_config.restart_required_changes(&config);
                if !pending.is_empty() {
                    warn!("Restart to apply: {}", pending.join(", "));
                }

                host.mixer.resize(new_config.host.strips);
                host.selector.set_chain_count(new_config.host.strips);
                host.recorder.set_arm_mode(new_config.host.arm_mode);
                registry.reconfigure_all(&new_config.surface);
                render_grid(&host, &mut registry);
                port.flush();
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    registry.deactivate_all();
    port.flush();
    port.disconnect();

    Ok(())
}

/// Draw every pad of the current sequencer bank
fn render_grid(host: &MemoryHost, registry: &mut DeviceRegistry) {
    let shown = registry.update_pads(&host.sequencer.pad_states(), PAD_MODE);
    debug!("Rendered {} pads", shown);
}

/// Push sequencer play state changes onto the pads
fn sync_pads(host: &MemoryHost, registry: &mut DeviceRegistry) {
    for (pad, state) in host.sequencer.take_changes() {
        if !registry.update_pad(pad, state, PAD_MODE) {
            debug!("Pad {} is not on any surface", pad);
        }
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
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
