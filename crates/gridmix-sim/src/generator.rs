//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Synthetic energy mix and demand generator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};
use gridmix_common::{DemandRecord, FuelMix, SyntheticConfig};
use rand::prelude::*;
use rand_distr::StandardNormal;
use tracing::{debug, warn};

use crate::series::{TimeSeries, TrendPoint};
use crate::window::TrendRequest;

/// Output of one reference solar unit, MW.
const SOLAR_UNIT_MW: f64 = 100.0;
const DAYLIGHT_HOURS: std::ops::RangeInclusive<u32> = 6..=18;

const OSCILLATION_STEP: f64 = 0.1;
const OSCILLATION_AMPLITUDE: f64 = 200.0;

const WEEKDAY_DEMAND_MW: f64 = 15_000.0;
const WEEKEND_DEMAND_MW: f64 = 12_000.0;
const FORECAST_SIGMA: f64 = 0.015;
const FORECAST_LIMIT: f64 = 0.03;

/// Per-source weights of the shared oscillation term.
struct Weights {
    wind: f64,
    hydro: f64,
    nuclear: f64,
    gas: f64,
    biomass: f64,
    coal: f64,
}

const OSCILLATION: Weights = Weights {
    wind: 1.0,
    hydro: 1.0,
    nuclear: 0.5,
    gas: 0.3,
    biomass: 0.2,
    coal: 0.1,
};

/// MW shift per year of horizon. Renewables grow, fossil output declines.
const TREND_PER_YEAR: FuelMix = FuelMix {
    solar: 40.0,
    wind: 80.0,
    hydro: 15.0,
    nuclear: 5.0,
    gas: -60.0,
    coal: -40.0,
    biomass: 5.0,
};

/// Statistically plausible stand-in for the live feeds.
#[derive(Debug)]
pub struct SyntheticModel<R: Rng = StdRng> {
    rng: R,
    utc_offset: FixedOffset,
}

impl SyntheticModel<StdRng> {
    pub fn from_seed(seed: u64, utc_offset_hours: i32) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), utc_offset_hours)
    }

    pub fn from_entropy(utc_offset_hours: i32) -> Self {
        Self::with_rng(StdRng::from_entropy(), utc_offset_hours)
    }

    /// Seeded when the configuration pins a seed, entropy-seeded otherwise.
    pub fn from_config(config: &SyntheticConfig) -> Self {
        match config.random_seed {
            Some(seed) => Self::from_seed(seed, config.utc_offset_hours),
            None => Self::from_entropy(config.utc_offset_hours),
        }
    }
}

impl<R: Rng> SyntheticModel<R> {
    pub fn with_rng(rng: R, utc_offset_hours: i32) -> Self {
        let utc_offset = FixedOffset::east_opt(utc_offset_hours.saturating_mul(3_600))
            .unwrap_or_else(|| Utc.fix());
        Self { rng, utc_offset }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Generate `point_count` points ending at `reference`, spaced by `interval`.
    ///
    /// With `long_horizon_years` set, older points are shifted towards a fossil-heavy
    /// mix proportionally to the horizon. An interval too wide for the calendar is
    /// narrowed so the series still holds exactly `point_count` points.
    pub fn generate(
        &mut self,
        reference: DateTime<Utc>,
        point_count: usize,
        interval: Duration,
        long_horizon_years: Option<f64>,
    ) -> TimeSeries {
        let requested_ms = i64::try_from(interval.as_millis())
            .unwrap_or(i64::MAX)
            .max(1);
        let step_ms = clamp_step(reference, point_count, requested_ms);
        if step_ms != requested_ms {
            warn!(
                requested_ms,
                step_ms, point_count, "interval exceeds representable history; narrowing"
            );
        }
        let years = long_horizon_years.unwrap_or(0.0).max(0.0);
        let mut points = Vec::with_capacity(point_count);

        for index in 0..point_count {
            let steps_back = (point_count - 1 - index) as i64;
            let offset = chrono::Duration::milliseconds(step_ms.saturating_mul(steps_back));
            let timestamp = reference
                .checked_sub_signed(offset)
                .unwrap_or_else(earliest_timestamp);
            let position = if point_count > 1 {
                index as f64 / (point_count - 1) as f64
            } else {
                1.0
            };
            let mix = self.sample_mix(timestamp, index, years * (position - 1.0));
            points.push(TrendPoint::new(timestamp, mix));
        }

        debug!(
            points = points.len(),
            interval_ms = step_ms,
            horizon_years = years,
            "generated synthetic series"
        );
        TimeSeries { points }
    }

    /// Series for a trend view window ending at `reference`.
    pub fn trend(&mut self, reference: DateTime<Utc>, request: &TrendRequest) -> TimeSeries {
        self.generate(
            reference,
            request.point_count(),
            request.interval(),
            request.long_horizon_years(),
        )
    }

    /// One demand reading per series point. Weekends run lighter than weekdays.
    pub fn synthetic_demand(&mut self, series: &TimeSeries) -> Vec<DemandRecord> {
        series
            .points
            .iter()
            .map(|point| {
                let local = point.timestamp.with_timezone(&self.utc_offset);
                let base = match local.weekday() {
                    Weekday::Sat | Weekday::Sun => WEEKEND_DEMAND_MW,
                    _ => WEEKDAY_DEMAND_MW,
                };
                let demand = base * self.rng.gen_range(0.85..=1.15);
                let noise: f64 = self.rng.sample(StandardNormal);
                let deviation = (noise * FORECAST_SIGMA).clamp(-FORECAST_LIMIT, FORECAST_LIMIT);
                DemandRecord {
                    timestamp: point.timestamp,
                    demand,
                    forecast: demand * (1.0 + deviation),
                }
            })
            .collect()
    }

    /// `trend_years` is `years × (position − 1)`: zero at the newest point,
    /// `-years` at the oldest.
    fn sample_mix(&mut self, timestamp: DateTime<Utc>, index: usize, trend_years: f64) -> FuelMix {
        let wave = (index as f64 * OSCILLATION_STEP).sin() * OSCILLATION_AMPLITUDE;
        let local_hour = timestamp.with_timezone(&self.utc_offset).hour();
        let solar = if DAYLIGHT_HOURS.contains(&local_hour) {
            SOLAR_UNIT_MW * self.rng.gen_range(5.0..=35.0)
        } else {
            self.rng.gen_range(0.0..=50.0)
        };
        let wind = self.rng.gen_range(1_000.0..=4_000.0);
        let hydro = self.rng.gen_range(3_000.0..=5_000.0);
        let nuclear = self.rng.gen_range(8_000.0..=9_000.0);
        let gas = self.rng.gen_range(1_000.0..=3_000.0);
        let biomass = self.rng.gen_range(200.0..=700.0);
        let coal = 0.0;

        FuelMix {
            solar: solar + TREND_PER_YEAR.solar * trend_years,
            wind: wind + wave * OSCILLATION.wind + TREND_PER_YEAR.wind * trend_years,
            hydro: hydro + wave * OSCILLATION.hydro + TREND_PER_YEAR.hydro * trend_years,
            nuclear: nuclear + wave * OSCILLATION.nuclear + TREND_PER_YEAR.nuclear * trend_years,
            gas: gas + wave * OSCILLATION.gas + TREND_PER_YEAR.gas * trend_years,
            coal: coal + wave * OSCILLATION.coal + TREND_PER_YEAR.coal * trend_years,
            biomass: biomass + wave * OSCILLATION.biomass + TREND_PER_YEAR.biomass * trend_years,
        }
        .clamped()
    }
}

/// Oldest timestamp a series may reach, kept a day clear of the calendar floor so
/// local-time conversions stay in range.
fn earliest_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC + chrono::Duration::days(1)
}

/// Largest step, at most `requested_ms`, whose full span still ends after
/// [`earliest_timestamp`].
fn clamp_step(reference: DateTime<Utc>, point_count: usize, requested_ms: i64) -> i64 {
    let steps = i64::try_from(point_count.saturating_sub(1)).unwrap_or(i64::MAX);
    if steps == 0 {
        return requested_ms;
    }
    let span_ms = (reference - earliest_timestamp()).num_milliseconds().max(steps);
    requested_ms.min(span_ms / steps).max(1)
}
