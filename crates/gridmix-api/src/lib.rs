//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Networking API surface for external integrations."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use gridmix_common::{Clock, Mode, Snapshot, SystemClock};
use gridmix_core::{GridState, SchedulerController, SchedulerError};
use gridmix_metrics::{metrics_router, SharedRegistry};
use gridmix_sim::{SyntheticModel, TimeSeries, TrendRequest, TrendSummary, WindowKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared API state exposed to handlers.
pub struct ApiState {
    scheduler: SchedulerController,
    trend_model: Mutex<SyntheticModel>,
    clock: Arc<dyn Clock>,
}

impl ApiState {
    /// `trend_model` serves unseeded trend requests; seeded ones get a fresh model.
    pub fn new(scheduler: SchedulerController, trend_model: SyntheticModel) -> Self {
        Self {
            scheduler,
            trend_model: Mutex::new(trend_model),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn trend(&self, request: &TrendRequest, seed: Option<u64>) -> TimeSeries {
        let reference = self.clock.now();
        let mut shared = self.trend_model.lock();
        match seed {
            Some(seed) => {
                let offset_hours = shared.utc_offset().local_minus_utc() / 3_600;
                drop(shared);
                SyntheticModel::from_seed(seed, offset_hours).trend(reference, request)
            }
            None => shared.trend(reference, request),
        }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("mode", &self.scheduler.current().mode)
            .finish_non_exhaustive()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Routes of the API. With a registry, `/metrics` is served alongside.
pub fn router(state: Arc<ApiState>, registry: Option<SharedRegistry>) -> Router {
    let api_routes = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/trend", get(get_trend))
        .route("/api/refresh", post(post_refresh))
        .route("/api/mode", put(put_mode))
        .with_state(state);

    let router = match registry {
        Some(registry) => api_routes.merge(metrics_router(registry)),
        None => api_routes,
    };
    router.layer(TraceLayer::new_for_http())
}

/// Spawn the JSON API, optionally exposing the metrics registry on the same listener.
pub fn spawn_api_server(
    state: Arc<ApiState>,
    addr: SocketAddr,
    registry: Option<SharedRegistry>,
) -> Result<ApiServer> {
    let router = router(state, registry);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let bound = listener
        .local_addr()
        .context("failed to read API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %bound, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %bound, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandAck {
    accepted: bool,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: Mode,
}

#[derive(Debug, Deserialize)]
struct TrendQuery {
    window: Option<String>,
    years: Option<i64>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendResponse {
    window: WindowKind,
    horizon_years: u32,
    summary: Option<TrendSummary>,
    #[serde(flatten)]
    series: TimeSeries,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

async fn get_state(State(state): State<Arc<ApiState>>) -> Json<GridState> {
    Json(state.scheduler.current())
}

async fn get_snapshot(State(state): State<Arc<ApiState>>) -> Json<Arc<Snapshot>> {
    Json(state.scheduler.current().snapshot)
}

async fn get_trend(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, ApiError> {
    let window = match query.window.as_deref() {
        Some(raw) => raw
            .parse::<WindowKind>()
            .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err))?,
        None => WindowKind::default(),
    };
    let request = TrendRequest::new(window, query.years);
    let seed = query.seed;
    let series = tokio::task::spawn_blocking(move || state.trend(&request, seed))
        .await
        .map_err(|err| {
            error!(error = %err, "trend generation task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "trend generation failed")
        })?;
    Ok(Json(TrendResponse {
        window: request.window,
        horizon_years: request.horizon_years,
        summary: series.summary(),
        series,
    }))
}

async fn post_refresh(
    State(state): State<Arc<ApiState>>,
) -> Result<(StatusCode, Json<CommandAck>), ApiError> {
    state.scheduler.refresh_now().await?;
    Ok((StatusCode::ACCEPTED, Json(CommandAck { accepted: true })))
}

async fn put_mode(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ModeRequest>,
) -> Result<Json<CommandAck>, ApiError> {
    state.scheduler.set_mode(request.mode).await?;
    info!(mode = %request.mode, "mode change requested over api");
    Ok(Json(CommandAck { accepted: true }))
}
