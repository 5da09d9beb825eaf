//! vitalsd — the Vitals daemon.
//!
//! # Usage
//!
//! ```text
//! vitalsd run --config /etc/vitals/vitals.toml --port 9600
//! vitalsd check --config /etc/vitals/vitals.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use vitals_core::VitalsConfig;
use vitals_health::{HealthCheckConfig, HealthMonitor, http_client_factory};
use vitals_metrics::MetricsAggregator;

#[derive(Parser)]
#[command(name = "vitalsd", about = "Vitals health-check daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run health checkers for the configured registrants.
    Run {
        /// Path to vitals.toml.
        #[arg(long, default_value = "vitals.toml")]
        config: PathBuf,

        /// Port for the HTTP API and /metrics.
        #[arg(long, default_value = "9600")]
        port: u16,
    },
    /// Validate a config file and print the resolved settings.
    Check {
        /// Path to vitals.toml.
        #[arg(long, default_value = "vitals.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,vitalsd=debug,vitals=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, port } => run(config, port).await,
        Command::Check { config } => check(config),
    }
}

fn check(path: PathBuf) -> anyhow::Result<()> {
    let config = VitalsConfig::from_file(&path)?;
    let health = HealthCheckConfig::from_config(&config)?;
    println!("config:            {}", path.display());
    println!("interval:          {:?}", health.interval);
    println!("failure budget:    {}", health.max_heartbeat_retries);
    println!("retry attempts:    {}", health.retry.max_attempts);
    println!("retry base delay:  {:?}", health.retry.base_delay);
    println!("probe timeout:     {:?}", health.probe_timeout);
    println!("registrants:       {}", config.registrants.len());
    for r in &config.registrants {
        println!("  - {r}");
    }
    Ok(())
}

async fn run(path: PathBuf, port: u16) -> anyhow::Result<()> {
    info!(config = %path.display(), "Vitals daemon starting");

    let config = VitalsConfig::from_file(&path)?;
    let health_config = HealthCheckConfig::from_config(&config)?;

    // ── Initialize subsystems ──────────────────────────────────

    let aggregator = MetricsAggregator::new(config.metrics.retention());
    info!(retention = config.metrics.retention(), "metrics aggregator initialized");

    let (monitor, reports) = HealthMonitor::new(
        Arc::new(aggregator.clone()),
        http_client_factory(),
        health_config,
        config.health.report_buffer(),
    );
    let monitor = Arc::new(monitor);
    info!(interval = ?health_config.interval, budget = health_config.max_heartbeat_retries, "health monitor initialized");

    for registrant in &config.registrants {
        if let Err(e) = monitor.register(registrant.clone()).await {
            warn!(registrant = %registrant, error = %e, "skipping registrant");
        }
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reaper_handle = tokio::spawn(vitalsd::reaper::run(
        monitor.clone(),
        reports,
        shutdown_rx,
    ));

    // ── Start API server ───────────────────────────────────────

    let router = vitalsd::build_router(aggregator, monitor.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown signal received");
        })
        .await?;

    // Returns after every checker has queued its report.
    monitor.stop_all().await;
    let _ = shutdown_tx.send(true);
    let _ = reaper_handle.await;

    info!("Vitals daemon stopped");
    Ok(())
}
