//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Metrics collection and export utilities."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub type SharedRegistry = Arc<Registry>;

pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Router exposing the registry at `/metrics`, for mounting into another server.
pub fn metrics_router(registry: SharedRegistry) -> Router {
    Router::new().route(
        "/metrics",
        get(move || metrics_handler(registry.clone())),
    )
}

/// Spawn a dedicated HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = metrics_router(registry);

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics encoding error"),
            )
                .into_response()
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Address the listener actually bound, resolving port 0.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Instrumentation of the refresh loop: cycles, feed failures and headline figures.
#[derive(Clone, Debug)]
pub struct RefreshMetrics {
    registry: SharedRegistry,
    cycles: IntCounterVec,
    fetch_failures: IntCounterVec,
    cycle_seconds: Histogram,
    renewable_percentage: Gauge,
    carbon_intensity: Gauge,
    last_refresh: IntGauge,
}

impl RefreshMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let cycles = IntCounterVec::new(
            Opts::new(
                "gridmix_refresh_cycles_total",
                "Completed refresh cycles by the mode of the published snapshot",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(cycles.clone()))?;

        let fetch_failures = IntCounterVec::new(
            Opts::new(
                "gridmix_fetch_failures_total",
                "Upstream feed failures by source and error kind",
            ),
            &["source", "kind"],
        )?;
        registry.register(Box::new(fetch_failures.clone()))?;

        let buckets = prometheus::exponential_buckets(0.005, 2.0, 14)
            .context("failed to construct histogram buckets")?;
        let cycle_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gridmix_refresh_cycle_seconds",
                "Wall time of a full fetch and aggregation cycle",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(cycle_seconds.clone()))?;

        let renewable_percentage = Gauge::with_opts(Opts::new(
            "gridmix_renewable_percentage",
            "Renewable share of generation in the latest snapshot",
        ))?;
        registry.register(Box::new(renewable_percentage.clone()))?;

        let carbon_intensity = Gauge::with_opts(Opts::new(
            "gridmix_carbon_intensity_grams_per_kwh",
            "Carbon intensity of generation in the latest snapshot",
        ))?;
        registry.register(Box::new(carbon_intensity.clone()))?;

        let last_refresh = IntGauge::with_opts(Opts::new(
            "gridmix_last_refresh_timestamp_seconds",
            "Unix time of the latest published snapshot",
        ))?;
        registry.register(Box::new(last_refresh.clone()))?;

        Ok(Self {
            registry,
            cycles,
            fetch_failures,
            cycle_seconds,
            renewable_percentage,
            carbon_intensity,
            last_refresh,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn record_cycle(&self, mode: &str, seconds: f64) {
        self.cycles.with_label_values(&[mode]).inc();
        self.cycle_seconds.observe(seconds);
    }

    pub fn record_fetch_failure(&self, source: &str, kind: &str) {
        self.fetch_failures.with_label_values(&[source, kind]).inc();
    }

    pub fn observe_snapshot(&self, renewable_percentage: f64, carbon_intensity: f64, at_unix: i64) {
        self.renewable_percentage.set(renewable_percentage);
        self.carbon_intensity.set(carbon_intensity);
        self.last_refresh.set(at_unix);
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_metrics_register_once_per_registry() {
        let registry = new_registry();
        let metrics = RefreshMetrics::new(registry.clone()).unwrap();
        metrics.record_cycle("live", 0.25);
        metrics.record_fetch_failure("demand", "network");
        metrics.observe_snapshot(44.4, 57.2, 1_717_243_200);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_owned())
            .collect();
        assert!(names.contains(&"gridmix_refresh_cycles_total".to_owned()));
        assert!(names.contains(&"gridmix_fetch_failures_total".to_owned()));
        assert!(RefreshMetrics::new(registry).is_err());
    }
}
