//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Synthetic time series containers."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use gridmix_calc::{carbon_intensity, renewable_percentage};
use gridmix_common::{FuelMix, GenerationRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub mix: FuelMix,
    pub total: f64,
    pub renewable_percentage: f64,
    pub carbon_intensity: f64,
}

impl TrendPoint {
    pub fn new(timestamp: DateTime<Utc>, mix: FuelMix) -> Self {
        Self {
            timestamp,
            mix,
            total: mix.total(),
            renewable_percentage: renewable_percentage(&mix),
            carbon_intensity: carbon_intensity(&mix),
        }
    }
}

/// Synthetic series ordered oldest to newest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub points: Vec<TrendPoint>,
}

/// Percent change between the two most recent points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub renewable_change: f64,
    pub carbon_intensity_change: f64,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&TrendPoint> {
        self.points.last()
    }

    pub fn to_generation_records(&self) -> Vec<GenerationRecord> {
        self.points
            .iter()
            .map(|point| GenerationRecord {
                timestamp: point.timestamp,
                mix: point.mix,
            })
            .collect()
    }

    /// Change of renewable share and carbon intensity between the last two points.
    /// A single point compares against itself; a zero previous value yields 0.
    pub fn summary(&self) -> Option<TrendSummary> {
        let current = self.points.last()?;
        let previous = self
            .points
            .len()
            .checked_sub(2)
            .and_then(|idx| self.points.get(idx))
            .unwrap_or(current);
        Some(TrendSummary {
            renewable_change: percent_change(
                previous.renewable_percentage,
                current.renewable_percentage,
            ),
            carbon_intensity_change: percent_change(
                previous.carbon_intensity,
                current.carbon_intensity,
            ),
        })
    }
}

fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}
