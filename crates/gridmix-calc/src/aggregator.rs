//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Derived grid metrics calculation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Turns per-feed records into a published [`Snapshot`].
//!
//! Aggregation is pure: the same records always produce the same snapshot.
//! The snapshot's `generated_at` is the timestamp of the latest generation
//! reading so that no wall clock leaks into the result.

use gridmix_common::{
    CarbonEmissionPoint, DemandRecord, EnergyMixPoint, GenerationRecord, GridHealth,
    GridOverview, GridStatus, RenewableProgress, Snapshot, ThresholdsConfig, WeatherRecord,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::capacity::estimate_capacity;
use crate::emissions::{carbon_intensity, reduction_percent, renewable_percentage};
use crate::errors::{AggregationError, Result};

const NOMINAL_FREQUENCY_HZ: f64 = 50.0;
const NOMINAL_VOLTAGE_V: f64 = 230.0;
const FREQUENCY_PER_MARGIN: f64 = 0.01;
const VOLTAGE_PER_MARGIN: f64 = 0.5;
const MARGIN_SWING_LIMIT: f64 = 20.0;

pub const LOW_MARGIN_ALERT: &str = "Low generation margin detected";
pub const HIGH_DEMAND_ALERT: &str = "High demand detected";
pub const HEAT_ALERT: &str = "High temperature affecting grid efficiency";

/// Targets and alert thresholds applied while deriving a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Renewable share goal, percent.
    pub renewable_target: f64,
    /// Emissions reference published with every emissions point, gCO₂/kWh.
    pub emissions_target: f64,
    /// Baseline the reduction percentage is measured against, gCO₂/kWh.
    pub emissions_baseline: f64,
    pub high_demand_mw: f64,
    pub heat_alert_celsius: f64,
    /// Margin (percent) above which the grid is reported online.
    pub online_margin: f64,
    /// Margin (percent) above which the grid is reported warning rather than offline.
    pub warning_margin: f64,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            renewable_target: 80.0,
            emissions_target: 200.0,
            emissions_baseline: 250.0,
            high_demand_mw: 18_000.0,
            heat_alert_celsius: 30.0,
            online_margin: 10.0,
            warning_margin: 5.0,
        }
    }
}

impl From<&ThresholdsConfig> for AggregationPolicy {
    fn from(config: &ThresholdsConfig) -> Self {
        Self {
            renewable_target: config.renewable_target,
            emissions_target: config.emissions_target,
            emissions_baseline: config.emissions_baseline,
            high_demand_mw: config.high_demand_mw,
            heat_alert_celsius: config.heat_alert_celsius,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    policy: AggregationPolicy,
}

impl MetricsAggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Derive a full snapshot from the demand and generation series plus an optional
    /// weather observation.
    pub fn aggregate(
        &self,
        demand: &[DemandRecord],
        generation: &[GenerationRecord],
        weather: Option<&WeatherRecord>,
    ) -> Result<Snapshot> {
        if generation.is_empty() {
            return Err(AggregationError::EmptyGeneration);
        }
        if demand.is_empty() {
            return Err(AggregationError::EmptyDemand);
        }
        ensure_finite(demand, generation, weather)?;

        let generation = normalize_generation(generation);
        let demand = normalize_demand(demand);
        let (Some(latest), Some(latest_demand)) = (generation.last(), demand.last()) else {
            return Err(AggregationError::EmptyGeneration);
        };
        if latest_demand.demand <= 0.0 {
            return Err(AggregationError::NonPositiveDemand(latest_demand.demand));
        }

        let policy = &self.policy;
        let total_generation = latest.mix.total();
        let total_demand = latest_demand.demand;
        let renewable = renewable_percentage(&latest.mix);
        let intensity = carbon_intensity(&latest.mix);

        let energy_mix: Vec<EnergyMixPoint> = generation.iter().map(EnergyMixPoint::from).collect();
        let carbon_emissions = energy_mix
            .iter()
            .map(|point| {
                let emissions = carbon_intensity(&point.mix);
                CarbonEmissionPoint {
                    timestamp: point.timestamp,
                    emissions,
                    target: policy.emissions_target,
                    reduction: reduction_percent(emissions, policy.emissions_baseline),
                }
            })
            .collect();

        let capacity = estimate_capacity(weather);
        let margin = (total_generation - total_demand) / total_demand * 100.0;
        let grid_efficiency = if total_generation > 0.0 {
            (total_demand.min(total_generation) / total_generation * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        trace!(margin, total_generation, total_demand, "aggregated grid readings");

        Ok(Snapshot {
            generated_at: latest.timestamp,
            grid_overview: GridOverview {
                total_generation,
                total_demand,
                renewable_percentage: renewable,
                carbon_intensity: intensity,
                grid_efficiency,
            },
            energy_mix,
            carbon_emissions,
            renewable_progress: RenewableProgress {
                current: renewable,
                target: policy.renewable_target,
                solar_capacity: capacity.solar,
                wind_capacity: capacity.wind,
                hydro_capacity: capacity.hydro,
                biomass_capacity: capacity.biomass,
            },
            grid_status: GridStatus {
                status: self.classify(margin),
                frequency: NOMINAL_FREQUENCY_HZ + FREQUENCY_PER_MARGIN * bounded_swing(margin),
                voltage: NOMINAL_VOLTAGE_V + VOLTAGE_PER_MARGIN * bounded_swing(margin),
                stability: (75.0 + 2.0 * margin).clamp(50.0, 100.0),
                alerts: self.alerts(margin, total_demand, weather),
            },
        })
    }

    fn classify(&self, margin: f64) -> GridHealth {
        if margin > self.policy.online_margin {
            GridHealth::Online
        } else if margin > self.policy.warning_margin {
            GridHealth::Warning
        } else {
            GridHealth::Offline
        }
    }

    fn alerts(&self, margin: f64, demand: f64, weather: Option<&WeatherRecord>) -> Vec<String> {
        let mut alerts = Vec::new();
        if margin < self.policy.warning_margin {
            alerts.push(LOW_MARGIN_ALERT.to_owned());
        }
        if demand > self.policy.high_demand_mw {
            alerts.push(HIGH_DEMAND_ALERT.to_owned());
        }
        if weather.is_some_and(|w| w.temperature > self.policy.heat_alert_celsius) {
            alerts.push(HEAT_ALERT.to_owned());
        }
        alerts
    }
}

fn bounded_swing(margin: f64) -> f64 {
    margin.clamp(-MARGIN_SWING_LIMIT, MARGIN_SWING_LIMIT)
}

fn ensure_finite(
    demand: &[DemandRecord],
    generation: &[GenerationRecord],
    weather: Option<&WeatherRecord>,
) -> Result<()> {
    if let Some(record) = generation.iter().find(|r| !r.mix.is_finite()) {
        return Err(AggregationError::NonFinite {
            field: "generation",
            timestamp: record.timestamp,
        });
    }
    if let Some(record) = demand
        .iter()
        .find(|r| !r.demand.is_finite() || !r.forecast.is_finite())
    {
        return Err(AggregationError::NonFinite {
            field: "demand",
            timestamp: record.timestamp,
        });
    }
    if let Some(w) = weather {
        let readings = [w.temperature, w.wind_speed, w.solar_radiation, w.humidity];
        if readings.iter().any(|value| !value.is_finite()) {
            return Err(AggregationError::NonFiniteWeather);
        }
    }
    Ok(())
}

/// Sorted by timestamp, last record wins on duplicates, negatives floored at zero.
fn normalize_generation(records: &[GenerationRecord]) -> Vec<GenerationRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.timestamp);
    let mut out: Vec<GenerationRecord> = Vec::with_capacity(sorted.len());
    for record in sorted {
        let record = GenerationRecord {
            timestamp: record.timestamp,
            mix: record.mix.clamped(),
        };
        match out.last_mut() {
            Some(last) if last.timestamp == record.timestamp => *last = record,
            _ => out.push(record),
        }
    }
    out
}

fn normalize_demand(records: &[DemandRecord]) -> Vec<DemandRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.timestamp);
    let mut out: Vec<DemandRecord> = Vec::with_capacity(sorted.len());
    for record in sorted {
        let record = DemandRecord {
            demand: record.demand.max(0.0),
            forecast: record.forecast.max(0.0),
            ..record
        };
        match out.last_mut() {
            Some(last) if last.timestamp == record.timestamp => *last = record,
            _ => out.push(record),
        }
    }
    out
}
