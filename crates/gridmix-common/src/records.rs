//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Typed records produced by the upstream grid feeds."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream feed identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Demand,
    Generation,
    Weather,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Demand,
        SourceKind::Generation,
        SourceKind::Weather,
    ];

    /// Static label used for metrics and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Demand => "demand",
            SourceKind::Generation => "generation",
            SourceKind::Weather => "weather",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output per fuel type in MW.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuelMix {
    pub solar: f64,
    pub wind: f64,
    pub hydro: f64,
    pub nuclear: f64,
    pub gas: f64,
    pub coal: f64,
    pub biomass: f64,
}

impl FuelMix {
    /// Sum of every fuel component.
    pub fn total(&self) -> f64 {
        self.solar + self.wind + self.hydro + self.nuclear + self.gas + self.coal + self.biomass
    }

    /// Solar, wind, hydro and biomass output.
    pub fn renewable(&self) -> f64 {
        self.solar + self.wind + self.hydro + self.biomass
    }

    /// Copy of the mix with every negative reading floored at zero.
    pub fn clamped(&self) -> Self {
        Self {
            solar: self.solar.max(0.0),
            wind: self.wind.max(0.0),
            hydro: self.hydro.max(0.0),
            nuclear: self.nuclear.max(0.0),
            gas: self.gas.max(0.0),
            coal: self.coal.max(0.0),
            biomass: self.biomass.max(0.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.solar,
            self.wind,
            self.hydro,
            self.nuclear,
            self.gas,
            self.coal,
            self.biomass,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

/// Row of the demand feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub timestamp: DateTime<Utc>,
    pub demand: f64,
    pub forecast: f64,
}

/// Row of the generation-by-fuel-type feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub mix: FuelMix,
}

/// Latest weather observation near the monitored region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    /// Air temperature in °C.
    pub temperature: f64,
    /// Wind speed in km/h.
    pub wind_speed: f64,
    /// Solar radiation in W/m².
    pub solar_radiation: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

/// Any record a feed can produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawRecord {
    Demand(DemandRecord),
    Generation(GenerationRecord),
    Weather(WeatherRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_mix_totals() {
        let mix = FuelMix {
            solar: 1500.0,
            wind: 2500.0,
            hydro: 4000.0,
            nuclear: 8500.0,
            gas: 2000.0,
            coal: 0.0,
            biomass: 400.0,
        };
        assert_eq!(mix.total(), 18_900.0);
        assert_eq!(mix.renewable(), 8_400.0);
    }

    #[test]
    fn clamped_floors_negative_readings() {
        let mix = FuelMix {
            solar: -3.0,
            gas: 10.0,
            ..FuelMix::default()
        };
        let clamped = mix.clamped();
        assert_eq!(clamped.solar, 0.0);
        assert_eq!(clamped.gas, 10.0);
    }
}
