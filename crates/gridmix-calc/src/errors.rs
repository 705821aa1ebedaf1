//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Derived grid metrics calculation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AggregationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("generation series is empty")]
    EmptyGeneration,
    #[error("demand series is empty")]
    EmptyDemand,
    #[error("latest demand must be positive, got {0} MW")]
    NonPositiveDemand(f64),
    #[error("non-finite {field} reading at {timestamp}")]
    NonFinite {
        field: &'static str,
        timestamp: DateTime<Utc>,
    },
    #[error("non-finite weather reading")]
    NonFiniteWeather,
}
