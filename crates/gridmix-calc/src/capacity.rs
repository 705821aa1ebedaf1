//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Derived grid metrics calculation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use gridmix_common::WeatherRecord;
use serde::{Deserialize, Serialize};

pub const BASE_SOLAR_MW: f64 = 4_000.0;
pub const BASE_WIND_MW: f64 = 12_000.0;
pub const BASE_HYDRO_MW: f64 = 5_000.0;
pub const BASE_BIOMASS_MW: f64 = 2_000.0;

/// Reference irradiance for the solar multiplier, W/m².
const REFERENCE_RADIATION: f64 = 1_000.0;
/// Reference wind speed for the wind multiplier, km/h.
const REFERENCE_WIND_SPEED: f64 = 15.0;

/// Weather-adjusted available capacity per renewable technology, MW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityEstimate {
    pub solar: f64,
    pub wind: f64,
    pub hydro: f64,
    pub biomass: f64,
}

/// Base capacities scaled by the weather observation when one is available.
pub fn estimate_capacity(weather: Option<&WeatherRecord>) -> CapacityEstimate {
    let Some(weather) = weather else {
        return CapacityEstimate {
            solar: BASE_SOLAR_MW,
            wind: BASE_WIND_MW,
            hydro: BASE_HYDRO_MW,
            biomass: BASE_BIOMASS_MW,
        };
    };
    CapacityEstimate {
        solar: (BASE_SOLAR_MW * weather.solar_radiation / REFERENCE_RADIATION).max(0.0),
        wind: (BASE_WIND_MW * weather.wind_speed / REFERENCE_WIND_SPEED).max(0.0),
        hydro: (BASE_HYDRO_MW * (1.0 + (weather.humidity - 50.0) / 100.0)).max(0.0),
        biomass: BASE_BIOMASS_MW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_capacity_without_weather() {
        let estimate = estimate_capacity(None);
        assert_eq!(estimate.solar, 4_000.0);
        assert_eq!(estimate.wind, 12_000.0);
    }

    #[test]
    fn weather_scales_capacity() {
        let weather = WeatherRecord {
            temperature: 22.0,
            wind_speed: 30.0,
            solar_radiation: 500.0,
            humidity: 70.0,
        };
        let estimate = estimate_capacity(Some(&weather));
        assert_eq!(estimate.solar, 2_000.0);
        assert_eq!(estimate.wind, 24_000.0);
        assert!((estimate.hydro - 6_000.0).abs() < 1e-9);
        assert_eq!(estimate.biomass, 2_000.0);
    }

    #[test]
    fn negative_readings_never_produce_negative_capacity() {
        let weather = WeatherRecord {
            temperature: -40.0,
            wind_speed: -5.0,
            solar_radiation: -10.0,
            humidity: -100.0,
        };
        let estimate = estimate_capacity(Some(&weather));
        assert_eq!(estimate.solar, 0.0);
        assert_eq!(estimate.wind, 0.0);
        assert_eq!(estimate.hydro, 0.0);
    }
}
