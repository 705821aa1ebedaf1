//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the GridMix daemon."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gridmix_api::{spawn_api_server, ApiServer, ApiState};
use gridmix_common::{
    duration_to_millis, init_tracing, init_tracing_with, AppConfig, ConsoleSink, Mode, Snapshot,
};
use gridmix_core::{FallbackOrchestrator, RefreshScheduler};
use gridmix_metrics::{new_registry, spawn_http_server, RefreshMetrics};
use gridmix_sim::{SyntheticModel, TimeSeries, TrendRequest, TrendSummary, WindowKind};
use gridmix_sources::SourceClient;
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "configs/gridmix.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("GridMix ", env!("CARGO_PKG_VERSION")),
    about = "GridMix grid metrics daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "MODE", help = "Start in live or synthetic mode")]
    mode: Option<Mode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the refresh loop with the API and metrics exporters")]
    Run,
    #[command(about = "Run one orchestration cycle and print the snapshot as JSON")]
    Snapshot,
    #[command(about = "Print a synthetic trend series as JSON")]
    Trend {
        #[arg(long, default_value = "24h", help = "1h, 6h, 24h, 7d, 30d or custom")]
        window: WindowKind,
        #[arg(
            long,
            allow_negative_numbers = true,
            help = "Horizon in years for the custom window (clamped to 1..=50)"
        )]
        years: Option<i64>,
        #[arg(long, help = "Seed for a reproducible series")]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG));

    let load_started = Instant::now();
    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    let mode = cli.mode.unwrap_or_default();

    let command = cli.command.unwrap_or(Commands::Run);
    match command {
        Commands::Run => init_tracing("gridmixd", &config.logging)?,
        // stdout carries the JSON output
        _ => init_tracing_with("gridmixd", &config.logging, ConsoleSink::Stderr)?,
    }
    info!(
        config_path = %loaded.source.display(),
        load_ms = duration_to_millis(load_started.elapsed()),
        "configuration loaded"
    );

    match command {
        Commands::Run => run_daemon(config, mode).await?,
        Commands::Snapshot => print_snapshot(&config, mode).await?,
        Commands::Trend {
            window,
            years,
            seed,
        } => print_trend(&config, TrendRequest::new(window, years), seed)?,
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, mode: Mode) -> Result<()> {
    let registry = new_registry();
    let refresh_metrics = RefreshMetrics::new(registry.clone())?;

    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(registry, config.metrics.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let feeds = Arc::new(SourceClient::from_config(&config.sources));
    let orchestrator =
        FallbackOrchestrator::from_config(&config, feeds).with_metrics(refresh_metrics.clone());
    let scheduler = RefreshScheduler::new(orchestrator, config.refresh.clone())
        .with_initial_mode(mode)
        .with_metrics(refresh_metrics)
        .start();

    let mut api_server: Option<ApiServer> = None;
    if config.api.enabled {
        let state = Arc::new(ApiState::new(
            scheduler.controller(),
            SyntheticModel::from_config(&config.synthetic),
        ));
        match spawn_api_server(state, config.api.listen, None) {
            Ok(server) => {
                info!(address = %server.addr(), "api server listening");
                api_server = Some(server);
            }
            Err(err) => {
                warn!(error = %err, "failed to start api server");
            }
        }
    } else {
        info!("api server disabled by configuration");
    }

    info!(mode = %mode, "daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");

    if let Some(server) = api_server {
        server.shutdown().await?;
    }
    scheduler.stop().await?;
    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct SnapshotOutput {
    mode: Mode,
    advisory: Option<String>,
    snapshot: Snapshot,
}

async fn print_snapshot(config: &AppConfig, mode: Mode) -> Result<()> {
    let feeds = Arc::new(SourceClient::from_config(&config.sources));
    let mut orchestrator = FallbackOrchestrator::from_config(config, feeds);
    let outcome = orchestrator.run_mode(mode).await;
    let output = SnapshotOutput {
        mode: outcome.mode,
        advisory: outcome.advisory,
        snapshot: outcome.snapshot,
    };
    let rendered =
        serde_json::to_string_pretty(&output).context("failed to serialise snapshot")?;
    println!("{rendered}");
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendOutput {
    window: WindowKind,
    horizon_years: u32,
    summary: Option<TrendSummary>,
    #[serde(flatten)]
    series: TimeSeries,
}

fn print_trend(config: &AppConfig, request: TrendRequest, seed: Option<u64>) -> Result<()> {
    let mut model = match seed {
        Some(seed) => SyntheticModel::from_seed(seed, config.synthetic.utc_offset_hours),
        None => SyntheticModel::from_config(&config.synthetic),
    };
    let series = model.trend(Utc::now(), &request);
    let output = TrendOutput {
        window: request.window,
        horizon_years: request.horizon_years,
        summary: series.summary(),
        series,
    };
    let rendered = serde_json::to_string_pretty(&output).context("failed to serialise trend")?;
    println!("{rendered}");
    Ok(())
}
