//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Published grid metrics snapshot and refresh mode."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{FuelMix, GenerationRecord};

/// Whether the current snapshot came from upstream feeds or the synthetic model.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Live,
    Synthetic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(Mode::Live),
            "synthetic" => Ok(Mode::Synthetic),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// Headline figures for the latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOverview {
    /// MW.
    pub total_generation: f64,
    /// MW.
    pub total_demand: f64,
    pub renewable_percentage: f64,
    /// gCO₂/kWh.
    pub carbon_intensity: f64,
    pub grid_efficiency: f64,
}

/// One timestamped generation mix entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyMixPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub mix: FuelMix,
}

impl From<&GenerationRecord> for EnergyMixPoint {
    fn from(record: &GenerationRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            mix: record.mix.clamped(),
        }
    }
}

/// Emissions reading aligned with an [`EnergyMixPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbonEmissionPoint {
    pub timestamp: DateTime<Utc>,
    pub emissions: f64,
    pub target: f64,
    pub reduction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewableProgress {
    pub current: f64,
    pub target: f64,
    pub solar_capacity: f64,
    pub wind_capacity: f64,
    pub hydro_capacity: f64,
    pub biomass_capacity: f64,
}

/// Coarse grid health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridHealth {
    Online,
    Warning,
    Offline,
}

impl GridHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridHealth::Online => "online",
            GridHealth::Warning => "warning",
            GridHealth::Offline => "offline",
        }
    }
}

impl fmt::Display for GridHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridStatus {
    pub status: GridHealth,
    /// Hz.
    pub frequency: f64,
    /// V.
    pub voltage: f64,
    pub stability: f64,
    pub alerts: Vec<String>,
}

/// Complete set of derived metrics for one refresh cycle.
///
/// `energy_mix` and `carbon_emissions` always have the same length and share
/// one strictly increasing timestamp sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub grid_overview: GridOverview,
    pub energy_mix: Vec<EnergyMixPoint>,
    pub carbon_emissions: Vec<CarbonEmissionPoint>,
    pub renewable_progress: RenewableProgress,
    pub grid_status: GridStatus,
}

impl Snapshot {
    /// Snapshot carrying no readings. Used before the first cycle completes and
    /// as the last-resort output when nothing could be derived.
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            grid_overview: GridOverview {
                total_generation: 0.0,
                total_demand: 0.0,
                renewable_percentage: 0.0,
                carbon_intensity: 0.0,
                grid_efficiency: 0.0,
            },
            energy_mix: Vec::new(),
            carbon_emissions: Vec::new(),
            renewable_progress: RenewableProgress {
                current: 0.0,
                target: 0.0,
                solar_capacity: 0.0,
                wind_capacity: 0.0,
                hydro_capacity: 0.0,
                biomass_capacity: 0.0,
            },
            grid_status: GridStatus {
                status: GridHealth::Offline,
                frequency: 0.0,
                voltage: 0.0,
                stability: 0.0,
                alerts: vec!["No grid data available".to_owned()],
            },
        }
    }

    /// Check the structural invariants every published snapshot must hold.
    pub fn is_consistent(&self) -> bool {
        if self.energy_mix.len() != self.carbon_emissions.len() {
            return false;
        }
        let aligned = self
            .energy_mix
            .iter()
            .zip(&self.carbon_emissions)
            .all(|(mix, emissions)| mix.timestamp == emissions.timestamp);
        let increasing = self
            .energy_mix
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp);
        let overview = &self.grid_overview;
        let in_range = |value: f64| (0.0..=100.0).contains(&value);
        aligned
            && increasing
            && in_range(overview.renewable_percentage)
            && in_range(overview.grid_efficiency)
            && in_range(self.renewable_progress.current)
            && in_range(self.grid_status.stability)
            && overview.total_generation >= 0.0
            && overview.total_demand >= 0.0
            && overview.carbon_intensity >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_snapshot_is_consistent() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::empty(at);
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.grid_status.status, GridHealth::Offline);
        assert!(snapshot.energy_mix.is_empty());
    }

    #[test]
    fn snapshot_serialises_with_camel_case_fields() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let value = serde_json::to_value(Snapshot::empty(at)).unwrap();
        assert!(value.get("gridOverview").is_some());
        assert!(value["gridOverview"].get("renewablePercentage").is_some());
        assert_eq!(value["gridStatus"]["status"], "offline");
    }

    #[test]
    fn energy_mix_point_flattens_fuels() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let point = EnergyMixPoint {
            timestamp: at,
            mix: FuelMix {
                solar: 12.0,
                ..FuelMix::default()
            },
        };
        let value = serde_json::to_value(point).unwrap();
        assert_eq!(value["solar"], 12.0);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Synthetic".parse::<Mode>().unwrap(), Mode::Synthetic);
        assert!("mock".parse::<Mode>().is_err());
    }
}
