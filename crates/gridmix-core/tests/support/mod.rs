//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "test"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Scripted feeds shared by the orchestration tests."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gridmix_calc::MetricsAggregator;
use gridmix_common::{
    DemandRecord, FuelMix, GenerationRecord, ManualClock, SourceKind, WeatherRecord,
};
use gridmix_core::{FallbackOrchestrator, OrchestratorSettings};
use gridmix_sim::SyntheticModel;
use gridmix_sources::{FetchError, GridFeeds};

/// What a scripted feed does on one call.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail(FetchError),
    /// Answer after the given delay.
    Delay(Duration, T),
    /// Never answer within any reasonable timeout.
    Hang,
}

#[derive(Debug)]
pub struct Script<T> {
    queue: Mutex<VecDeque<Reply<T>>>,
    fallback: Reply<T>,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    pub fn always(reply: Reply<T>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: reply,
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a reply used before the fallback.
    pub fn first(self, reply: Reply<T>) -> Self {
        self.queue.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self, source: SourceKind) -> Result<T, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Ok(value) => Ok(value),
            Reply::Fail(err) => Err(err),
            Reply::Delay(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Err(FetchError::network(source, "hung"))
            }
        }
    }
}

#[derive(Debug)]
pub struct StubFeeds {
    pub demand: Script<Vec<DemandRecord>>,
    pub generation: Script<Vec<GenerationRecord>>,
    pub weather: Script<Option<WeatherRecord>>,
}

impl StubFeeds {
    /// Feeds that answer with the reference readings every time.
    pub fn healthy() -> Self {
        Self {
            demand: Script::always(Reply::Ok(demand(15_000.0))),
            generation: Script::always(Reply::Ok(generation())),
            weather: Script::always(Reply::Ok(Some(weather()))),
        }
    }

    /// Feeds that refuse every connection.
    pub fn offline() -> Self {
        Self {
            demand: Script::always(Reply::Fail(refused(SourceKind::Demand))),
            generation: Script::always(Reply::Fail(refused(SourceKind::Generation))),
            weather: Script::always(Reply::Fail(refused(SourceKind::Weather))),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.demand.calls() + self.generation.calls() + self.weather.calls()
    }
}

#[async_trait]
impl GridFeeds for StubFeeds {
    async fn demand(&self) -> Result<Vec<DemandRecord>, FetchError> {
        self.demand.next(SourceKind::Demand).await
    }

    async fn generation(&self) -> Result<Vec<GenerationRecord>, FetchError> {
        self.generation.next(SourceKind::Generation).await
    }

    async fn weather(&self) -> Result<Option<WeatherRecord>, FetchError> {
        self.weather.next(SourceKind::Weather).await
    }
}

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 17, 0, 0).unwrap()
}

pub fn refused(source: SourceKind) -> FetchError {
    FetchError::network(source, "connection refused")
}

pub fn reference_mix() -> FuelMix {
    FuelMix {
        nuclear: 8_500.0,
        hydro: 4_000.0,
        gas: 2_000.0,
        wind: 2_500.0,
        solar: 1_500.0,
        biomass: 400.0,
        coal: 0.0,
    }
}

pub fn demand(value: f64) -> Vec<DemandRecord> {
    vec![DemandRecord {
        timestamp: noon(),
        demand: value,
        forecast: 14_500.0,
    }]
}

pub fn generation() -> Vec<GenerationRecord> {
    vec![GenerationRecord {
        timestamp: noon(),
        mix: reference_mix(),
    }]
}

pub fn weather() -> WeatherRecord {
    WeatherRecord {
        temperature: 24.0,
        wind_speed: 15.0,
        solar_radiation: 800.0,
        humidity: 60.0,
    }
}

pub fn orchestrator(feeds: Arc<StubFeeds>, settings: OrchestratorSettings) -> FallbackOrchestrator {
    FallbackOrchestrator::new(
        feeds,
        MetricsAggregator::default(),
        SyntheticModel::from_seed(42, -5),
        settings,
    )
    .with_clock(Arc::new(ManualClock::new(noon())))
}
