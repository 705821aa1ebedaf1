//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Derived grid metrics calculation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Emission factors and the share/intensity formulas built on them.

use gridmix_common::FuelMix;

/// Lifecycle emission factors in gCO₂/kWh.
pub const COAL_FACTOR: f64 = 820.0;
pub const GAS_FACTOR: f64 = 490.0;
pub const NUCLEAR_FACTOR: f64 = 12.0;
pub const RENEWABLE_FACTOR: f64 = 0.0;

/// Output-weighted carbon intensity of a mix in gCO₂/kWh; 0 when nothing is generated.
pub fn carbon_intensity(mix: &FuelMix) -> f64 {
    let total = mix.total();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted = mix.coal * COAL_FACTOR
        + mix.gas * GAS_FACTOR
        + mix.nuclear * NUCLEAR_FACTOR
        + mix.renewable() * RENEWABLE_FACTOR;
    (weighted / total).max(0.0)
}

/// Renewable share of total output in percent, clamped to [0, 100].
pub fn renewable_percentage(mix: &FuelMix) -> f64 {
    let total = mix.total();
    if total <= 0.0 {
        return 0.0;
    }
    (mix.renewable() / total * 100.0).clamp(0.0, 100.0)
}

/// Reduction of `emissions` against `baseline` in percent, clamped to [0, 100].
pub fn reduction_percent(emissions: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    ((baseline - emissions) / baseline * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_mix() -> FuelMix {
        FuelMix {
            solar: 1500.0,
            wind: 2500.0,
            hydro: 4000.0,
            nuclear: 8500.0,
            gas: 2000.0,
            coal: 0.0,
            biomass: 400.0,
        }
    }

    #[test]
    fn intensity_of_reference_mix() {
        let intensity = carbon_intensity(&reference_mix());
        let expected = (2000.0 * GAS_FACTOR + 8500.0 * NUCLEAR_FACTOR) / 18_900.0;
        assert!((intensity - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_output_yields_zero() {
        let empty = FuelMix::default();
        assert_eq!(carbon_intensity(&empty), 0.0);
        assert_eq!(renewable_percentage(&empty), 0.0);
    }

    #[test]
    fn renewable_share_matches_formula() {
        let pct = renewable_percentage(&reference_mix());
        assert!((pct - 8_400.0 / 18_900.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn reduction_is_clamped() {
        assert_eq!(reduction_percent(300.0, 250.0), 0.0);
        assert_eq!(reduction_percent(0.0, 250.0), 100.0);
        assert!((reduction_percent(125.0, 250.0) - 50.0).abs() < 1e-9);
    }
}
