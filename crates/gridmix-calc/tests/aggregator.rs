//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "test"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Aggregation scenarios and sampled invariants."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Duration, TimeZone, Utc};
use gridmix_calc::{
    carbon_intensity, renewable_percentage, AggregationError, AggregationPolicy,
    MetricsAggregator,
};
use gridmix_common::{DemandRecord, FuelMix, GenerationRecord, GridHealth, WeatherRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
}

fn reference_mix() -> FuelMix {
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

fn demand(value: f64) -> Vec<DemandRecord> {
    vec![DemandRecord {
        timestamp: noon(),
        demand: value,
        forecast: 14_500.0,
    }]
}

fn generation(mix: FuelMix) -> Vec<GenerationRecord> {
    vec![GenerationRecord {
        timestamp: noon(),
        mix,
    }]
}

fn random_mix(rng: &mut StdRng) -> FuelMix {
    FuelMix {
        solar: rng.gen_range(0.0..3_000.0),
        wind: rng.gen_range(0.0..5_000.0),
        hydro: rng.gen_range(0.0..6_000.0),
        nuclear: rng.gen_range(0.0..10_000.0),
        gas: rng.gen_range(0.0..4_000.0),
        coal: rng.gen_range(0.0..2_000.0),
        biomass: rng.gen_range(0.0..800.0),
    }
}

#[test]
fn healthy_margin_reports_online_with_full_stability() {
    let aggregator = MetricsAggregator::default();
    let snapshot = aggregator
        .aggregate(&demand(15_000.0), &generation(reference_mix()), None)
        .unwrap();

    let overview = snapshot.grid_overview;
    assert_eq!(overview.total_generation, 18_900.0);
    assert_eq!(overview.total_demand, 15_000.0);
    assert_eq!(snapshot.grid_status.status, GridHealth::Online);
    assert_eq!(snapshot.grid_status.stability, 100.0);
    assert!(snapshot.grid_status.alerts.is_empty());
    assert!((snapshot.grid_status.frequency - 50.2).abs() < 1e-9);
    assert!((snapshot.grid_status.voltage - 240.0).abs() < 1e-9);
    assert!((overview.grid_efficiency - 15_000.0 / 18_900.0 * 100.0).abs() < 1e-9);
    assert_eq!(snapshot.renewable_progress.target, 80.0);
    assert_eq!(snapshot.carbon_emissions[0].target, 200.0);
    assert!(snapshot.is_consistent());
}

#[test]
fn thin_margin_raises_alerts_in_order() {
    let aggregator = MetricsAggregator::default();
    let weather = WeatherRecord {
        temperature: 33.0,
        wind_speed: 10.0,
        solar_radiation: 900.0,
        humidity: 50.0,
    };
    let snapshot = aggregator
        .aggregate(&demand(18_500.0), &generation(reference_mix()), Some(&weather))
        .unwrap();
    assert_eq!(snapshot.grid_status.status, GridHealth::Offline);
    assert_eq!(
        snapshot.grid_status.alerts,
        vec![
            "Low generation margin detected".to_owned(),
            "High demand detected".to_owned(),
            "High temperature affecting grid efficiency".to_owned(),
        ]
    );
    assert_eq!(snapshot.renewable_progress.solar_capacity, 3_600.0);
}

#[test]
fn warning_band_between_five_and_ten_percent() {
    let aggregator = MetricsAggregator::default();
    // 18_900 / 17_500 => 8% margin
    let snapshot = aggregator
        .aggregate(&demand(17_500.0), &generation(reference_mix()), None)
        .unwrap();
    assert_eq!(snapshot.grid_status.status, GridHealth::Warning);
    assert!((snapshot.grid_status.stability - 91.0).abs() < 1e-9);
}

#[test]
fn rejects_unusable_inputs() {
    let aggregator = MetricsAggregator::default();
    assert_eq!(
        aggregator.aggregate(&demand(15_000.0), &[], None),
        Err(AggregationError::EmptyGeneration)
    );
    assert_eq!(
        aggregator.aggregate(&[], &generation(reference_mix()), None),
        Err(AggregationError::EmptyDemand)
    );
    assert_eq!(
        aggregator.aggregate(&demand(0.0), &generation(reference_mix()), None),
        Err(AggregationError::NonPositiveDemand(0.0))
    );
    let mut broken = reference_mix();
    broken.wind = f64::NAN;
    assert!(matches!(
        aggregator.aggregate(&demand(15_000.0), &generation(broken), None),
        Err(AggregationError::NonFinite { .. })
    ));
}

#[test]
fn series_is_sorted_and_aligned() {
    let aggregator = MetricsAggregator::default();
    let records: Vec<GenerationRecord> = (0..6)
        .rev()
        .map(|hour| GenerationRecord {
            timestamp: noon() - Duration::hours(hour),
            mix: reference_mix(),
        })
        .collect();
    let mut shuffled = records.clone();
    shuffled.swap(0, 4);
    let snapshot = aggregator
        .aggregate(&demand(15_000.0), &shuffled, None)
        .unwrap();
    assert_eq!(snapshot.energy_mix.len(), 6);
    assert_eq!(snapshot.generated_at, noon());
    assert!(snapshot.is_consistent());
}

#[test]
fn aggregation_is_deterministic() {
    let aggregator = MetricsAggregator::new(AggregationPolicy::default());
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let mix = random_mix(&mut rng);
        let load = rng.gen_range(1_000.0..25_000.0);
        let first = aggregator.aggregate(&demand(load), &generation(mix), None);
        let second = aggregator.aggregate(&demand(load), &generation(mix), None);
        assert_eq!(first, second);
    }
}

#[test]
fn renewable_share_stays_in_range() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let mix = random_mix(&mut rng);
        let pct = renewable_percentage(&mix);
        assert!((0.0..=100.0).contains(&pct));
        if mix.total() > 0.0 {
            let expected = mix.renewable() / mix.total() * 100.0;
            assert!((pct - expected).abs() < 1e-9);
        }
    }
}

#[test]
fn intensity_grows_with_fossil_share() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..500 {
        let mix = random_mix(&mut rng);
        let shift = rng.gen_range(0.0..=1.0) * mix.renewable();
        // Replace part of the renewable output with the same amount of gas.
        let scale = if mix.renewable() > 0.0 {
            (mix.renewable() - shift) / mix.renewable()
        } else {
            1.0
        };
        let dirtier = FuelMix {
            solar: mix.solar * scale,
            wind: mix.wind * scale,
            hydro: mix.hydro * scale,
            biomass: mix.biomass * scale,
            gas: mix.gas + shift,
            ..mix
        };
        assert!(carbon_intensity(&dirtier) + 1e-9 >= carbon_intensity(&mix));
    }
}
