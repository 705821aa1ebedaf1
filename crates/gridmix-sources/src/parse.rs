//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Upstream grid feed clients."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Payload parsers for the demand and generation CSV feeds and the weather
//! JSON document.

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use gridmix_common::{DemandRecord, FuelMix, GenerationRecord, SourceKind, WeatherRecord};
use serde::Deserialize;

use crate::error::FetchError;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DEFAULT_TEMPERATURE: f64 = 20.0;
const DEFAULT_WIND_SPEED: f64 = 15.0;
const DEFAULT_SOLAR_RADIATION: f64 = 800.0;
const DEFAULT_HUMIDITY: f64 = 60.0;

/// Parse `timestamp,demand[,forecast]` rows. Missing or empty forecast reads as 0.
pub fn parse_demand_csv(body: &str) -> Result<Vec<DemandRecord>, FetchError> {
    let feed = SourceKind::Demand;
    let mut records = Vec::new();
    for (line, row) in csv_rows(feed, body)? {
        check_width(feed, line, &row, 2, 3)?;
        records.push(DemandRecord {
            timestamp: parse_timestamp(&row[0]).ok_or_else(|| {
                FetchError::parse(feed, line, format!("invalid timestamp '{}'", &row[0]))
            })?,
            demand: number(feed, line, "demand", row.get(1))?,
            forecast: number(feed, line, "forecast", row.get(2))?,
        });
    }
    Ok(records)
}

/// Parse `timestamp,nuclear,hydro,gas,wind,solar[,biomass[,coal]]` rows.
pub fn parse_generation_csv(body: &str) -> Result<Vec<GenerationRecord>, FetchError> {
    let feed = SourceKind::Generation;
    let mut records = Vec::new();
    for (line, row) in csv_rows(feed, body)? {
        check_width(feed, line, &row, 6, 8)?;
        let timestamp = parse_timestamp(&row[0]).ok_or_else(|| {
            FetchError::parse(feed, line, format!("invalid timestamp '{}'", &row[0]))
        })?;
        let mix = FuelMix {
            nuclear: number(feed, line, "nuclear", row.get(1))?,
            hydro: number(feed, line, "hydro", row.get(2))?,
            gas: number(feed, line, "gas", row.get(3))?,
            wind: number(feed, line, "wind", row.get(4))?,
            solar: number(feed, line, "solar", row.get(5))?,
            biomass: number(feed, line, "biomass", row.get(6))?,
            coal: number(feed, line, "coal", row.get(7))?,
        };
        records.push(GenerationRecord { timestamp, mix });
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: WeatherProperties,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherProperties {
    temperature: Option<f64>,
    wind_speed: Option<f64>,
    solar_radiation: Option<f64>,
    humidity: Option<f64>,
}

/// Parse the weather document. An empty feature list yields `None`.
pub fn parse_weather_json(body: &str) -> Result<Option<WeatherRecord>, FetchError> {
    let collection: FeatureCollection = serde_json::from_str(body).map_err(|err| {
        FetchError::parse(SourceKind::Weather, err.line() as u64, err.to_string())
    })?;
    let Some(feature) = collection.features.into_iter().next() else {
        return Ok(None);
    };
    let props = feature.properties;
    Ok(Some(WeatherRecord {
        temperature: props.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        wind_speed: props.wind_speed.unwrap_or(DEFAULT_WIND_SPEED),
        solar_radiation: props.solar_radiation.unwrap_or(DEFAULT_SOLAR_RADIATION),
        humidity: props.humidity.unwrap_or(DEFAULT_HUMIDITY),
    }))
}

/// Accepts RFC 3339 and the naive forms used by the feeds (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Non-blank data rows paired with their 1-based line numbers. The header row is skipped.
fn csv_rows(feed: SourceKind, body: &str) -> Result<Vec<(u64, StringRecord)>, FetchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| {
            let line = err.position().map(|pos| pos.line()).unwrap_or(0);
            FetchError::parse(feed, line, err.to_string())
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        rows.push((line, record));
    }
    Ok(rows)
}

fn check_width(
    feed: SourceKind,
    line: u64,
    row: &StringRecord,
    min: usize,
    max: usize,
) -> Result<(), FetchError> {
    if row.len() < min || row.len() > max {
        return Err(FetchError::parse(
            feed,
            line,
            format!("expected {}-{} fields, found {}", min, max, row.len()),
        ));
    }
    Ok(())
}

fn number(feed: SourceKind, line: u64, field: &str, cell: Option<&str>) -> Result<f64, FetchError> {
    let cell = cell.unwrap_or("");
    if cell.is_empty() {
        return Ok(0.0);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FetchError::parse(
            feed,
            line,
            format!("{} is not a number: '{}'", field, cell),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use chrono::TimeZone;

    #[test]
    fn demand_rows_skip_header_and_blank_lines() {
        let body = "timestamp,demand,forecast\n2024-06-01T10:00:00Z,15000,14500\n\n2024-06-01 11:00,15200,\n";
        let records = parse_demand_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].demand, 15_000.0);
        assert_eq!(records[0].forecast, 14_500.0);
        assert_eq!(
            records[1].timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()
        );
        assert_eq!(records[1].forecast, 0.0);
    }

    #[test]
    fn demand_forecast_column_is_optional() {
        let body = "timestamp,demand\n2024-06-01T10:00:00Z,15000\n";
        let records = parse_demand_csv(body).unwrap();
        assert_eq!(records[0].forecast, 0.0);
    }

    #[test]
    fn short_rows_are_rejected_with_their_line() {
        let body = "timestamp,demand,forecast\n2024-06-01T10:00:00Z,15000,14500\n2024-06-01T11:00:00Z\n";
        let err = parse_demand_csv(body).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Parse);
        match err {
            FetchError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_numeric_cells_are_parse_errors() {
        let body = "timestamp,nuclear,hydro,gas,wind,solar,biomass,coal\n2024-06-01T10:00:00Z,8500,abc,2000,2500,1500,400,0\n";
        let err = parse_generation_csv(body).unwrap_err();
        assert!(err.to_string().contains("hydro"));
    }

    #[test]
    fn nan_cells_are_rejected() {
        let body = "timestamp,demand\n2024-06-01T10:00:00Z,NaN\n";
        assert!(parse_demand_csv(body).is_err());
    }

    #[test]
    fn generation_accepts_six_to_eight_fields() {
        let body = "timestamp,nuclear,hydro,gas,wind,solar,biomass,coal\n\
                    2024-06-01T10:00:00Z,8500,4000,2000,2500,1500,400,0\n\
                    2024-06-01T11:00:00Z,8400,4100,2100,2400,1600\n";
        let records = parse_generation_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mix.total(), 18_900.0);
        assert_eq!(records[1].mix.biomass, 0.0);
        assert_eq!(records[1].mix.coal, 0.0);
    }

    #[test]
    fn header_only_body_yields_no_records() {
        let records = parse_generation_csv("timestamp,nuclear,hydro,gas,wind,solar\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let body = "timestamp,demand\nyesterday,15000\n";
        let err = parse_demand_csv(body).unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn weather_uses_first_feature_and_defaults() {
        let body = r#"{"features":[{"properties":{"temperature":31.5,"humidity":40}},{"properties":{"temperature":0}}]}"#;
        let weather = parse_weather_json(body).unwrap().unwrap();
        assert_eq!(weather.temperature, 31.5);
        assert_eq!(weather.humidity, 40.0);
        assert_eq!(weather.wind_speed, DEFAULT_WIND_SPEED);
        assert_eq!(weather.solar_radiation, DEFAULT_SOLAR_RADIATION);
    }

    #[test]
    fn weather_without_features_is_absent() {
        assert_eq!(parse_weather_json(r#"{"features":[]}"#).unwrap(), None);
    }

    #[test]
    fn malformed_weather_document_is_parse_error() {
        let err = parse_weather_json("{\"features\": [").unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Parse);
        assert_eq!(err.feed(), SourceKind::Weather);
    }
}
