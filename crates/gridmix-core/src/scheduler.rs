//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Primary orchestration and lifecycle management."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::{Duration, Instant};

use gridmix_common::{duration_to_millis, Clock, Mode, RefreshConfig, SystemClock};
use gridmix_metrics::RefreshMetrics;
use gridmix_rt::{Timer, TokioTimer};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::orchestrator::{CycleOutcome, FallbackOrchestrator};
use crate::state::GridState;

const COMMAND_BUFFER: usize = 16;

/// Requests accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Switch mode and re-arm the timer with that mode's interval.
    SetMode(Mode),
    /// Cancel the pending timer and run a cycle now.
    RefreshNow,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("refresh scheduler is no longer running")]
    Stopped,
    #[error("refresh scheduler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Owns the orchestrator, the mode and the pending timer.
pub struct RefreshScheduler {
    orchestrator: FallbackOrchestrator,
    intervals: RefreshConfig,
    initial_mode: Mode,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    metrics: Option<RefreshMetrics>,
}

impl RefreshScheduler {
    pub fn new(orchestrator: FallbackOrchestrator, intervals: RefreshConfig) -> Self {
        Self {
            orchestrator,
            intervals,
            initial_mode: Mode::Live,
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
            metrics: None,
        }
    }

    pub fn with_initial_mode(mut self, mode: Mode) -> Self {
        self.initial_mode = mode;
        self
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

    fn interval_for(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Live => self.intervals.live_interval,
            Mode::Synthetic => self.intervals.synthetic_interval,
        }
    }

    /// Spawn the scheduler task. The first cycle runs immediately.
    pub fn start(self) -> SchedulerHandle {
        let initial = GridState::initial(
            self.clock.now(),
            self.initial_mode,
            self.interval_for(self.initial_mode),
        );
        let (state_tx, state_rx) = watch::channel(initial);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(self.run_loop(state_tx, command_rx, shutdown_rx));
        info!("refresh scheduler started");

        SchedulerHandle {
            controller: SchedulerController {
                commands: command_tx,
                state: state_rx,
            },
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run_loop(
        mut self,
        state: watch::Sender<GridState>,
        mut commands: mpsc::Receiver<SchedulerCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut mode = self.initial_mode;
        let mut error: Option<String> = None;
        let mut cycles: u64 = 0;

        'cycle: loop {
            if *shutdown.borrow() {
                break;
            }
            state.send_modify(|current| current.is_refreshing = true);

            let started = Instant::now();
            let outcome = self.orchestrator.run_mode(mode).await;
            if *shutdown.borrow() {
                debug!("scheduler stopped during a cycle; discarding result");
                break;
            }

            if outcome.mode == Mode::Live || outcome.advisory.is_some() {
                error = outcome.advisory.clone();
            }
            if outcome.mode != mode {
                info!(from = %mode, to = %outcome.mode, "refresh mode changed by cycle outcome");
            }
            mode = outcome.mode;
            cycles += 1;
            let interval = self.interval_for(mode);
            self.record(&outcome, started.elapsed());
            state.send_replace(GridState {
                snapshot: Arc::new(outcome.snapshot),
                last_updated: Some(self.clock.now()),
                mode,
                error: error.clone(),
                is_refreshing: false,
                refresh_interval: interval,
                cycles,
            });
            debug!(
                mode = %mode,
                interval_ms = duration_to_millis(interval),
                cycles,
                "cycle published"
            );

            let mut pending = self.timer.sleep(interval);
            loop {
                tokio::select! {
                    _ = &mut pending => continue 'cycle,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break 'cycle;
                        }
                    }
                    command = commands.recv() => match command {
                        Some(SchedulerCommand::RefreshNow) => {
                            debug!("manual refresh requested");
                            continue 'cycle;
                        }
                        Some(SchedulerCommand::SetMode(requested)) => {
                            if requested == mode {
                                continue;
                            }
                            info!(from = %mode, to = %requested, "refresh mode changed by request");
                            mode = requested;
                            error = None;
                            let interval = self.interval_for(mode);
                            state.send_modify(|current| {
                                current.mode = mode;
                                current.error = None;
                                current.refresh_interval = interval;
                            });
                            pending = self.timer.sleep(interval);
                        }
                        None => break 'cycle,
                    }
                }
            }
        }
        info!(cycles, "refresh scheduler stopped");
    }

    fn record(&self, outcome: &CycleOutcome, elapsed: Duration) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        metrics.record_cycle(outcome.mode.as_str(), elapsed.as_secs_f64());
        let overview = &outcome.snapshot.grid_overview;
        metrics.observe_snapshot(
            overview.renewable_percentage,
            overview.carbon_intensity,
            self.clock.now().timestamp(),
        );
        if let Some(advisory) = &outcome.advisory {
            warn!(advisory = %advisory, "serving synthetic data");
        }
    }
}

/// Cloneable access to a running scheduler: state subscription and commands.
#[derive(Debug, Clone)]
pub struct SchedulerController {
    commands: mpsc::Sender<SchedulerCommand>,
    state: watch::Receiver<GridState>,
}

impl SchedulerController {
    pub fn subscribe(&self) -> watch::Receiver<GridState> {
        self.state.clone()
    }

    /// Latest published state.
    pub fn current(&self) -> GridState {
        self.state.borrow().clone()
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::SetMode(mode)).await
    }

    pub async fn refresh_now(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::RefreshNow).await
    }

    async fn send(&self, command: SchedulerCommand) -> Result<(), SchedulerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SchedulerError::Stopped)
    }
}

/// Owner handle returned by [`RefreshScheduler::start`].
#[derive(Debug)]
pub struct SchedulerHandle {
    controller: SchedulerController,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn controller(&self) -> SchedulerController {
        self.controller.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GridState> {
        self.controller.subscribe()
    }

    pub fn current(&self) -> GridState {
        self.controller.current()
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<(), SchedulerError> {
        self.controller.set_mode(mode).await
    }

    pub async fn refresh_now(&self) -> Result<(), SchedulerError> {
        self.controller.refresh_now().await
    }

    /// Cancel the pending timer and wait for the task to exit. A cycle already in
    /// flight runs to completion but its result is not published.
    pub async fn stop(self) -> Result<(), SchedulerError> {
        let _ = self.shutdown.send(true);
        self.task.await?;
        Ok(())
    }
}
