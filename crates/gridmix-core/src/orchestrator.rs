//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Primary orchestration and lifecycle management."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gridmix_calc::{AggregationPolicy, MetricsAggregator};
use gridmix_common::{AppConfig, Clock, Mode, Snapshot, SourceKind, SystemClock};
use gridmix_metrics::RefreshMetrics;
use gridmix_rt::{RetryPolicy, Timer, TokioTimer};
use gridmix_sim::SyntheticModel;
use gridmix_sources::{FetchError, GridFeeds};
use tracing::{debug, error, info, warn};

const UNAVAILABLE_ADVISORY: &str = "Live grid data unavailable; showing simulated data";
const DISABLED_ADVISORY: &str = "Live sources disabled; showing simulated data";

/// Knobs of one orchestration cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub live_enabled: bool,
    /// Budget for one source per cycle, retries included.
    pub source_timeout: Duration,
    pub retry: RetryPolicy,
    pub history_points: usize,
    pub history_interval: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            live_enabled: true,
            source_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            history_points: 24,
            history_interval: Duration::from_secs(3_600),
        }
    }
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            live_enabled: config.sources.enabled,
            source_timeout: config.sources.timeout,
            retry: RetryPolicy::new(config.sources.retry_attempts, config.sources.retry_delay),
            history_points: config.synthetic.history_points,
            history_interval: config.synthetic.history_interval,
        }
    }
}

/// Result of one feed branch within a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchStatus {
    /// Number of records the feed returned.
    Fetched(usize),
    Failed(FetchError),
    /// Not contacted this cycle.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchReport {
    pub source: SourceKind,
    pub status: BranchStatus,
}

impl BranchReport {
    fn from_result<T>(
        source: SourceKind,
        result: &Result<T, FetchError>,
        count: impl Fn(&T) -> usize,
    ) -> Self {
        let status = match result {
            Ok(records) => BranchStatus::Fetched(count(records)),
            Err(err) => BranchStatus::Failed(err.clone()),
        };
        Self { source, status }
    }

    fn skipped(source: SourceKind) -> Self {
        Self {
            source,
            status: BranchStatus::Skipped,
        }
    }
}

/// Output of a cycle. Always carries a valid snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub snapshot: Snapshot,
    pub mode: Mode,
    pub advisory: Option<String>,
    pub branches: Vec<BranchReport>,
}

impl CycleOutcome {
    /// Whether any feed was contacted during the cycle.
    pub fn attempted_live(&self) -> bool {
        self.branches
            .iter()
            .any(|branch| branch.status != BranchStatus::Skipped)
    }
}

/// Fetches the three feeds concurrently and derives a snapshot, falling back to the
/// synthetic model whenever the live path cannot produce one.
pub struct FallbackOrchestrator {
    feeds: Arc<dyn GridFeeds>,
    aggregator: MetricsAggregator,
    model: SyntheticModel,
    settings: OrchestratorSettings,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    metrics: Option<RefreshMetrics>,
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("settings", &self.settings)
            .field("policy", self.aggregator.policy())
            .finish()
    }
}

impl FallbackOrchestrator {
    pub fn new(
        feeds: Arc<dyn GridFeeds>,
        aggregator: MetricsAggregator,
        model: SyntheticModel,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            feeds,
            aggregator,
            model,
            settings,
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
            metrics: None,
        }
    }

    /// Orchestrator wired from configuration with the system clock and tokio timer.
    pub fn from_config(config: &AppConfig, feeds: Arc<dyn GridFeeds>) -> Self {
        Self::new(
            feeds,
            MetricsAggregator::new(AggregationPolicy::from(&config.thresholds)),
            SyntheticModel::from_config(&config.synthetic),
            OrchestratorSettings::from(config),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_metrics(mut self, metrics: RefreshMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Attempt a live snapshot; every failure is contained and replaced by synthetic data.
    pub async fn run(&mut self) -> CycleOutcome {
        if !self.settings.live_enabled {
            debug!("live sources disabled; generating synthetic snapshot");
            return self
                .synthetic_outcome(Some(DISABLED_ADVISORY.to_owned()), skipped_branches());
        }

        let feeds = self.feeds.clone();
        let (demand, generation, weather) = tokio::join!(
            self.guarded(SourceKind::Demand, || feeds.demand()),
            self.guarded(SourceKind::Generation, || feeds.generation()),
            self.guarded(SourceKind::Weather, || feeds.weather()),
        );

        let branches = vec![
            BranchReport::from_result(SourceKind::Demand, &demand, Vec::len),
            BranchReport::from_result(SourceKind::Generation, &generation, Vec::len),
            BranchReport::from_result(SourceKind::Weather, &weather, |w| usize::from(w.is_some())),
        ];
        self.record_failures(&branches);

        match (demand, generation) {
            (Ok(demand), Ok(generation)) => {
                let weather = match weather {
                    Ok(observation) => observation,
                    Err(err) => {
                        debug!(error = %err, "continuing without weather observation");
                        None
                    }
                };
                match self
                    .aggregator
                    .aggregate(&demand, &generation, weather.as_ref())
                {
                    Ok(snapshot) => {
                        info!(
                            renewable = snapshot.grid_overview.renewable_percentage,
                            status = %snapshot.grid_status.status,
                            "live snapshot derived"
                        );
                        CycleOutcome {
                            snapshot,
                            mode: Mode::Live,
                            advisory: None,
                            branches,
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "live data could not be aggregated; falling back");
                        let advisory = format!("{UNAVAILABLE_ADVISORY} ({err})");
                        self.synthetic_outcome(Some(advisory), branches)
                    }
                }
            }
            (demand, generation) => {
                let detail = [demand.err(), generation.err()]
                    .into_iter()
                    .flatten()
                    .map(|err| err.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(detail = %detail, "live feeds failed; falling back");
                let advisory = format!("{UNAVAILABLE_ADVISORY} ({detail})");
                self.synthetic_outcome(Some(advisory), branches)
            }
        }
    }

    /// Synthetic snapshot without contacting the feeds.
    pub async fn run_synthetic(&mut self) -> CycleOutcome {
        self.synthetic_outcome(None, skipped_branches())
    }

    /// Cycle appropriate for `mode`.
    pub async fn run_mode(&mut self, mode: Mode) -> CycleOutcome {
        match mode {
            Mode::Live => self.run().await,
            Mode::Synthetic => self.run_synthetic().await,
        }
    }

    /// One feed fetch retried per policy. The source timeout bounds every attempt and
    /// retry delay together, so a hung feed costs at most one timeout per cycle.
    async fn guarded<T, F, Fut>(&self, source: SourceKind, fetch: F) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let timeout = self.settings.source_timeout;
        let fetch = &fetch;
        let attempts = self.settings.retry.run(self.timer.as_ref(), move |attempt| async move {
            debug!(source = %source, attempt, "fetching feed");
            fetch().await
        });
        match tokio::time::timeout(timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(source, timeout)),
        }
    }

    fn record_failures(&self, branches: &[BranchReport]) {
        for branch in branches {
            if let BranchStatus::Failed(err) = &branch.status {
                warn!(source = %branch.source, kind = %err.kind(), error = %err, "feed fetch failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_fetch_failure(branch.source.as_str(), err.kind().as_str());
                }
            }
        }
    }

    fn synthetic_outcome(
        &mut self,
        advisory: Option<String>,
        branches: Vec<BranchReport>,
    ) -> CycleOutcome {
        CycleOutcome {
            snapshot: self.synthetic_snapshot(),
            mode: Mode::Synthetic,
            advisory,
            branches,
        }
    }

    fn synthetic_snapshot(&mut self) -> Snapshot {
        let now = self.clock.now();
        let series = self.model.generate(
            now,
            self.settings.history_points,
            self.settings.history_interval,
            None,
        );
        let demand = self.model.synthetic_demand(&series);
        match self
            .aggregator
            .aggregate(&demand, &series.to_generation_records(), None)
        {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    error = %err,
                    "synthetic data could not be aggregated; publishing empty snapshot"
                );
                Snapshot::empty(now)
            }
        }
    }
}

fn skipped_branches() -> Vec<BranchReport> {
    SourceKind::ALL
        .iter()
        .copied()
        .map(BranchReport::skipped)
        .collect()
}
