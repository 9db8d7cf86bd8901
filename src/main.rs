//! Sentinela - environmental hazard monitoring node
//!
//! # Usage
//!
//! ```bash
//! # Station mode with the synthetic sensor bank
//! cargo run --release
//!
//! # Inject a hazard after 20 samples to exercise the alarm path
//! cargo run --release -- --hazard-after 20
//!
//! # Access-point mode: serve the configuration portal only
//! cargo run --release -- --access-point
//! ```
//!
//! # Options
//!
//! - `--config <PATH>`: node TOML config (otherwise `SENTINELA_CONFIG` or
//!   `./node_config.toml`)
//! - `--data-dir <DIR>`: buffer and credential storage (default `./data`)
//! - `--evict-oldest`: evict instead of reject when the buffer is full
//!
//! # Environment Variables
//!
//! - `SENTINELA_CONFIG`: Path to the node TOML config
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sentinela::buffer::{OverflowPolicy, ReadingBuffer};
use sentinela::config::{credentials, NodeConfig};
use sentinela::control::{ControlLoop, LoopTimers};
use sentinela::link::{LinkManager, SimulatedWifi};
use sentinela::portal::{self, PortalState};
use sentinela::sensors::{AlarmControl, LogAlarm, RiskEvaluator, SyntheticSensors};
use sentinela::uplink::{ApiClient, DeliveryCoordinator};

#[derive(Parser, Debug)]
#[command(name = "sentinela")]
#[command(about = "Environmental hazard monitoring node")]
#[command(version)]
struct CliArgs {
    /// Path to the node TOML config (overrides the default search order)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for the reading buffer and credentials
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Force access-point mode (configuration portal) even when credentials
    /// exist
    #[arg(long)]
    access_point: bool,

    /// Portal bind address in access-point mode
    #[arg(long, default_value = "0.0.0.0:8080")]
    portal_addr: String,

    /// Evict the oldest buffered reading when the buffer is full instead of
    /// rejecting new ones
    #[arg(long)]
    evict_oldest: bool,

    /// Make the synthetic sensor bank turn hazardous after N samples
    #[arg(long, value_name = "N")]
    hazard_after: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => NodeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => NodeConfig::load(),
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    // Buffer open failure is non-fatal: the node keeps running with no
    // persistence rather than halting monitoring.
    let policy = if args.evict_oldest {
        OverflowPolicy::EvictOldest
    } else {
        OverflowPolicy::RejectNew
    };
    let buffer = match ReadingBuffer::open(&args.data_dir, config.buffer.limit, policy) {
        Ok(buffer) => Some(buffer),
        Err(e) => {
            warn!(error = %e, "Failed to open reading buffer, running without persistence");
            None
        }
    };

    // An unreadable credential file means "not configured": the node falls
    // back to access-point mode instead of exiting.
    let creds = credentials::load_or_unconfigured(&args.data_dir).filter(|c| !c.is_empty());

    let access_point = args.access_point || creds.is_none();
    if access_point && creds.is_none() {
        info!("No Wi-Fi credentials configured, starting in access-point mode");
    }

    let driver = Box::new(SimulatedWifi::new(3));
    let link = if access_point {
        LinkManager::access_point(driver)
    } else {
        LinkManager::new(
            driver,
            creds,
            Duration::from_secs(config.link.reconnect_cooldown_secs),
        )
    };

    let device_id = if config.api.device_id.is_empty() {
        link.mac_address()
    } else {
        config.api.device_id.clone()
    };

    let client = ApiClient::new(&config.api).context("Failed to build API client")?;
    let coordinator = DeliveryCoordinator::new(
        client.clone(),
        Duration::from_secs(config.timers.reading_interval_secs),
    );

    let bank: Box<dyn sentinela::SensorBank> = match args.hazard_after {
        Some(onset) => Box::new(SyntheticSensors::with_hazard_after(onset)),
        None => Box::new(SyntheticSensors::new()),
    };
    let evaluator = RiskEvaluator::new(config.thresholds.clone());
    let alarm = AlarmControl::new(
        Box::new(LogAlarm::new()),
        Duration::from_secs(config.alarm.mute_secs),
    );

    let timers = LoopTimers {
        sample_interval: Duration::from_secs(config.timers.sample_interval_secs),
        reading_interval: Duration::from_secs(config.timers.reading_interval_secs),
        status_interval: Duration::from_secs(config.timers.status_interval_secs),
        command_poll_interval: Duration::from_secs(config.timers.command_poll_interval_secs),
    };

    let control = ControlLoop::new(
        device_id, bank, evaluator, alarm, link, buffer, coordinator, client, &timers,
    );

    if access_point {
        let portal_state = Arc::new(PortalState {
            data_dir: args.data_dir.clone(),
            shutdown: shutdown.clone(),
        });
        let addr = args
            .portal_addr
            .parse()
            .context("Invalid portal bind address")?;

        let portal_task = tokio::spawn(portal::serve(addr, portal_state));
        control.run(shutdown.clone()).await;

        match portal_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Portal exited with error"),
            Err(e) => warn!(error = %e, "Portal task panicked"),
        }
        info!("Exiting for restart; supervisor relaunches in station mode");
    } else {
        control.run(shutdown).await;
    }

    info!("Sentinela stopped");
    Ok(())
}

/// Trip the shutdown token on Ctrl-C.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
    });
}
