//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the metrics engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Core shared primitives for the GridMix workspace.
//! This crate exposes the grid data model (raw feed records and the published
//! snapshot), configuration loading, logging and clock utilities consumed
//! across the workspace.

pub mod config;
pub mod logging;
pub mod records;
pub mod snapshot;
pub mod time;

pub use config::{
    ApiConfig, AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, RefreshConfig,
    SourcesConfig, SyntheticConfig, ThresholdsConfig,
};
pub use logging::{init_tracing, init_tracing_with, ConsoleSink, LogFormat};
pub use records::{
    DemandRecord, FuelMix, GenerationRecord, RawRecord, SourceKind, WeatherRecord,
};
pub use snapshot::{
    CarbonEmissionPoint, EnergyMixPoint, GridHealth, GridOverview, GridStatus, Mode,
    RenewableProgress, Snapshot,
};
pub use time::{duration_to_millis, Clock, ManualClock, SystemClock};
